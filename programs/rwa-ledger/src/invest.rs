//! Investment manager: position lifecycle, profit computation and settlement.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::state::*;

/// Open a fixed-term position against an active asset. Terms (APY, period)
/// are snapshotted into the position; later registry changes never reprice
/// an open position.
pub fn invest(ctx: Context<Invest>, amount: u64) -> Result<()> {
    require!(!ctx.accounts.config.paused, LedgerError::Paused);
    require!(
        !ctx.accounts.user_state.blacklisted,
        LedgerError::Blacklisted
    );
    require!(
        !ctx.accounts.config.whitelist_enabled || ctx.accounts.user_state.whitelisted,
        LedgerError::NotWhitelisted
    );
    require!(amount > 0, LedgerError::InvalidAmount);

    // authoritative re-derivation of Asset::validate_investment, one
    // distinct reason per gate
    let asset = &mut ctx.accounts.asset;
    require!(
        asset.status == AssetStatus::Active,
        LedgerError::AssetNotActive
    );
    require!(
        amount >= asset.min_investment,
        LedgerError::BelowMinInvestment
    );
    require!(
        amount <= asset.max_investment,
        LedgerError::AboveMaxInvestment
    );
    asset.commit_capacity(amount)?;

    let now = Clock::get()?.unix_timestamp;
    let config = &mut ctx.accounts.config;
    let id = config
        .total_investments
        .checked_add(1)
        .ok_or(LedgerError::Overflow)?;

    let investment = &mut ctx.accounts.investment;
    investment.id = id;
    investment.investor = ctx.accounts.investor.key();
    investment.asset_id = ctx.accounts.asset.id;
    investment.amount = amount;
    investment.start_ts = now;
    investment.end_ts = now
        .checked_add(ctx.accounts.asset.period_secs)
        .ok_or(LedgerError::Overflow)?;
    investment.apy_bps = ctx.accounts.asset.apy_bps;
    investment.status = InvestmentStatus::Active;
    investment.profit = 0;
    investment.claimed_profit = 0;
    investment.bump = ctx.bumps.investment;

    config.total_investments = id;

    let user_state = &mut ctx.accounts.user_state;
    if user_state.owner == Pubkey::default() {
        user_state.owner = ctx.accounts.investor.key();
        user_state.bump = ctx.bumps.user_state;
    }
    user_state.investment_count = user_state
        .investment_count
        .checked_add(1)
        .ok_or(LedgerError::Overflow)?;

    // pull the principal last; the whole instruction is atomic either way
    let cpi_accounts = Transfer {
        from: ctx.accounts.investor_token_account.to_account_info(),
        to: ctx.accounts.principal_vault.to_account_info(),
        authority: ctx.accounts.investor.to_account_info(),
    };
    token::transfer(
        CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
        amount,
    )?;

    emit!(Invested {
        id,
        investor: ctx.accounts.investor.key(),
        asset_id: ctx.accounts.asset.id,
        amount,
        apy_bps: ctx.accounts.investment.apy_bps,
        end_ts: ctx.accounts.investment.end_ts,
    });

    msg!("investment {} opened", id);
    Ok(())
}

/// View: profit owed right now, 0 for settled positions.
pub fn calculate_profit(ctx: Context<CalculateProfit>) -> Result<u64> {
    let now = Clock::get()?.unix_timestamp;
    ctx.accounts
        .investment
        .accrued_profit(now, ctx.accounts.params.min_daily_profit_bps)
}

/// Settle a matured position: pay accrued profit from the asset's reserve
/// and return the principal. All-or-nothing — if the reserve cannot cover
/// the profit, the whole redemption is blocked.
pub fn redeem(ctx: Context<Redeem>) -> Result<()> {
    require!(!ctx.accounts.config.paused, LedgerError::Paused);
    require!(
        !ctx.accounts.user_state.blacklisted,
        LedgerError::Blacklisted
    );
    require!(
        !ctx.accounts.config.whitelist_enabled || ctx.accounts.user_state.whitelisted,
        LedgerError::NotWhitelisted
    );

    let now = Clock::get()?.unix_timestamp;
    // cooldown keyed by the position owner, not the transaction signer
    require!(
        ctx.accounts
            .user_state
            .redeem_cooldown_ok(now, ctx.accounts.params.investment_cooldown_secs),
        LedgerError::CooldownActive
    );
    require!(
        ctx.accounts.investment.status == InvestmentStatus::Active,
        LedgerError::InvestmentNotActive
    );
    require!(
        now >= ctx.accounts.investment.end_ts,
        LedgerError::NotMatured
    );

    let profit = ctx
        .accounts
        .investment
        .accrued_profit(now, ctx.accounts.params.min_daily_profit_bps)?;
    require!(
        ctx.accounts.reserve.balance >= profit,
        LedgerError::InsufficientReserve
    );
    // the bookkeeping can outrun the vault after an emergency drain; refuse
    // with the accounting error rather than a raw token-program failure
    require!(
        ctx.accounts.pool_vault.amount >= profit,
        LedgerError::InsufficientReserve
    );

    let id = ctx.accounts.investment.id;
    let asset_id = ctx.accounts.investment.asset_id;
    let principal = ctx.accounts.investment.amount;
    let investor = ctx.accounts.investment.investor;

    // all bookkeeping lands before any token leaves the vaults
    ctx.accounts.investment.settle(profit)?;
    ctx.accounts.asset.release_capacity(principal)?;
    ctx.accounts.user_state.last_redeem_ts = now;
    if profit > 0 {
        ctx.accounts.reserve.debit(profit)?;
        let pool = &mut ctx.accounts.profit_pool;
        pool.total_withdrawn = pool
            .total_withdrawn
            .checked_add(profit as u128)
            .ok_or(LedgerError::Overflow)?;
        pool.total_reserved = pool
            .total_reserved
            .checked_sub(profit)
            .ok_or(LedgerError::InsufficientReserve)?;
    }

    // profit straight from the pool vault to the investor; skipped entirely
    // when zero so no zero-amount transfer is ever issued
    if profit > 0 {
        let pool_seeds: &[&[u8]] = &[b"profit_pool", &[ctx.accounts.profit_pool.bump]];
        let signer = &[pool_seeds];
        let cpi_accounts = Transfer {
            from: ctx.accounts.pool_vault.to_account_info(),
            to: ctx.accounts.investor_token_account.to_account_info(),
            authority: ctx.accounts.profit_pool.to_account_info(),
        };
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                cpi_accounts,
                signer,
            ),
            profit,
        )?;
    }

    let config_seeds: &[&[u8]] = &[b"config", &[ctx.accounts.config.bump]];
    let signer = &[config_seeds];
    let cpi_accounts = Transfer {
        from: ctx.accounts.principal_vault.to_account_info(),
        to: ctx.accounts.investor_token_account.to_account_info(),
        authority: ctx.accounts.config.to_account_info(),
    };
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            cpi_accounts,
            signer,
        ),
        principal,
    )?;

    emit!(Redeemed {
        id,
        investor,
        asset_id,
        principal,
        profit,
        timestamp: now,
    });

    msg!("investment {} redeemed, profit {}", id, profit);
    Ok(())
}

/// Administrative unwind of an Active position at any time: principal back,
/// no profit computed or paid.
pub fn emergency_cancel(ctx: Context<EmergencyCancel>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;

    let id = ctx.accounts.investment.id;
    let asset_id = ctx.accounts.investment.asset_id;
    let principal = ctx.accounts.investment.amount;
    let investor = ctx.accounts.investment.investor;

    ctx.accounts.investment.cancel()?;
    ctx.accounts.asset.release_capacity(principal)?;

    let config_seeds: &[&[u8]] = &[b"config", &[ctx.accounts.config.bump]];
    let signer = &[config_seeds];
    let cpi_accounts = Transfer {
        from: ctx.accounts.principal_vault.to_account_info(),
        to: ctx.accounts.investor_token_account.to_account_info(),
        authority: ctx.accounts.config.to_account_info(),
    };
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            cpi_accounts,
            signer,
        ),
        principal,
    )?;

    emit!(InvestmentCancelled {
        id,
        investor,
        asset_id,
        principal,
        timestamp: now,
    });

    msg!("investment {} cancelled", id);
    Ok(())
}

#[derive(Accounts)]
pub struct Invest<'info> {
    #[account(mut, seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub asset: Account<'info, Asset>,

    #[account(
        init,
        payer = investor,
        space = Investment::LEN,
        seeds = [b"investment", &(config.total_investments + 1).to_le_bytes()[..]],
        bump
    )]
    pub investment: Account<'info, Investment>,

    #[account(
        init_if_needed,
        payer = investor,
        space = UserState::LEN,
        seeds = [b"user", investor.key().as_ref()],
        bump
    )]
    pub user_state: Account<'info, UserState>,

    #[account(mut, seeds = [b"principal_vault"], bump)]
    pub principal_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = investor_token_account.mint == config.stable_mint @ LedgerError::InvalidConfig
    )]
    pub investor_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub investor: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct CalculateProfit<'info> {
    #[account(
        seeds = [b"parameters"],
        bump = params.bump,
        seeds::program = rwa_params::ID
    )]
    pub params: Account<'info, rwa_params::Parameters>,

    pub investment: Account<'info, Investment>,
}

#[derive(Accounts)]
pub struct Redeem<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, Config>,

    #[account(
        seeds = [b"parameters"],
        bump = params.bump,
        seeds::program = rwa_params::ID
    )]
    pub params: Account<'info, rwa_params::Parameters>,

    #[account(
        mut,
        constraint = asset.id == investment.asset_id @ LedgerError::InvalidConfig
    )]
    pub asset: Account<'info, Asset>,

    #[account(mut, has_one = investor @ LedgerError::Unauthorized)]
    pub investment: Account<'info, Investment>,

    // seeds derive from the recorded owner, so the cooldown state consulted
    // here is always the owner's even if calling ever opens up
    #[account(
        mut,
        seeds = [b"user", investment.investor.as_ref()],
        bump = user_state.bump
    )]
    pub user_state: Account<'info, UserState>,

    #[account(
        mut,
        constraint = reserve.asset_id == investment.asset_id @ LedgerError::InvalidConfig
    )]
    pub reserve: Account<'info, AssetReserve>,

    #[account(mut, seeds = [b"profit_pool"], bump = profit_pool.bump)]
    pub profit_pool: Account<'info, ProfitPool>,

    #[account(mut, seeds = [b"pool_vault"], bump)]
    pub pool_vault: Account<'info, TokenAccount>,

    #[account(mut, seeds = [b"principal_vault"], bump)]
    pub principal_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = investor_token_account.owner == investment.investor @ LedgerError::InvalidConfig,
        constraint = investor_token_account.mint == config.stable_mint @ LedgerError::InvalidConfig
    )]
    pub investor_token_account: Account<'info, TokenAccount>,

    pub investor: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct EmergencyCancel<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        constraint = asset.id == investment.asset_id @ LedgerError::InvalidConfig
    )]
    pub asset: Account<'info, Asset>,

    #[account(mut)]
    pub investment: Account<'info, Investment>,

    #[account(mut, seeds = [b"principal_vault"], bump)]
    pub principal_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = investor_token_account.owner == investment.investor @ LedgerError::InvalidConfig,
        constraint = investor_token_account.mint == config.stable_mint @ LedgerError::InvalidConfig
    )]
    pub investor_token_account: Account<'info, TokenAccount>,

    pub admin: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[event]
pub struct Invested {
    pub id: u64,
    pub investor: Pubkey,
    pub asset_id: u64,
    pub amount: u64,
    pub apy_bps: u64,
    pub end_ts: i64,
}

#[event]
pub struct Redeemed {
    pub id: u64,
    pub investor: Pubkey,
    pub asset_id: u64,
    pub principal: u64,
    pub profit: u64,
    pub timestamp: i64,
}

#[event]
pub struct InvestmentCancelled {
    pub id: u64,
    pub investor: Pubkey,
    pub asset_id: u64,
    pub principal: u64,
    pub timestamp: i64,
}
