//! Profit pool: the segregated reserve that pays accrued yield. A ledger of
//! available profit capital per asset, independent of position lifecycle.

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount, Transfer};

use crate::state::*;
use crate::EMERGENCY_WITHDRAW_TIMELOCK;

/// Top up an asset's reserve. Deliberately permissionless: under-funding only
/// blocks redemptions, it cannot extract value.
pub fn deposit_profit(ctx: Context<DepositProfit>, amount: u64) -> Result<()> {
    require!(!ctx.accounts.config.paused, LedgerError::Paused);
    require!(amount > 0, LedgerError::InvalidAmount);

    // bookkeeping first; the instruction reverts as a whole if the pull fails
    let reserve = &mut ctx.accounts.reserve;
    let pool = &mut ctx.accounts.profit_pool;
    reserve.credit(amount)?;
    pool.total_deposited = pool
        .total_deposited
        .checked_add(amount as u128)
        .ok_or(LedgerError::Overflow)?;
    pool.total_reserved = pool
        .total_reserved
        .checked_add(amount)
        .ok_or(LedgerError::Overflow)?;

    let cpi_accounts = Transfer {
        from: ctx.accounts.depositor_token_account.to_account_info(),
        to: ctx.accounts.pool_vault.to_account_info(),
        authority: ctx.accounts.depositor.to_account_info(),
    };
    token::transfer(
        CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
        amount,
    )?;

    emit!(ProfitDeposited {
        asset_id: ctx.accounts.asset.id,
        depositor: ctx.accounts.depositor.key(),
        amount,
        reserve_balance: ctx.accounts.reserve.balance,
    });
    Ok(())
}

/// Operator-only draw against one asset's reserve, paid straight to the
/// recipient in a single transfer. The old pay-the-operator-then-forward
/// variant had an extra failure point and is gone.
pub fn withdraw_asset_profit(ctx: Context<WithdrawAssetProfit>, amount: u64) -> Result<()> {
    require!(!ctx.accounts.config.paused, LedgerError::Paused);
    require!(amount > 0, LedgerError::InvalidAmount);

    let now = Clock::get()?.unix_timestamp;
    let reserve = &mut ctx.accounts.reserve;
    reserve.debit(amount)?;

    let pool = &mut ctx.accounts.profit_pool;
    pool.total_withdrawn = pool
        .total_withdrawn
        .checked_add(amount as u128)
        .ok_or(LedgerError::Overflow)?;
    pool.total_reserved = pool
        .total_reserved
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientReserve)?;

    let recipient_state = &mut ctx.accounts.recipient_state;
    if recipient_state.owner == Pubkey::default() {
        recipient_state.owner = ctx.accounts.recipient_token_account.owner;
        recipient_state.bump = ctx.bumps.recipient_state;
    }
    recipient_state.last_profit_withdraw_ts = now;

    transfer_from_pool_vault(
        &ctx.accounts.profit_pool,
        &ctx.accounts.pool_vault,
        &ctx.accounts.recipient_token_account,
        &ctx.accounts.token_program,
        amount,
    )?;

    emit!(AssetProfitWithdrawn {
        asset_id: ctx.accounts.asset.id,
        recipient: ctx.accounts.recipient_token_account.owner,
        amount,
        reserve_balance: ctx.accounts.reserve.balance,
    });
    Ok(())
}

/// Generic administrative safety valve, not asset-scoped. Gated by a
/// per-account cooldown and by the reserve floor, and it may only draw the
/// surplus not allocated to any asset's reserve.
pub fn withdraw_profit(ctx: Context<WithdrawProfit>, amount: u64) -> Result<()> {
    require!(amount > 0, LedgerError::InvalidAmount);

    let now = Clock::get()?.unix_timestamp;
    let params = &ctx.accounts.params;
    require!(
        ctx.accounts
            .admin_state
            .withdraw_cooldown_ok(now, params.profit_withdrawal_cooldown_secs),
        LedgerError::CooldownActive
    );

    let remaining = ctx
        .accounts
        .pool_vault
        .amount
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientReserve)?;
    require!(
        remaining >= params.min_reserve_floor,
        LedgerError::ReserveFloorBreached
    );
    require!(
        remaining >= ctx.accounts.profit_pool.total_reserved,
        LedgerError::InsufficientReserve
    );

    let pool = &mut ctx.accounts.profit_pool;
    pool.total_withdrawn = pool
        .total_withdrawn
        .checked_add(amount as u128)
        .ok_or(LedgerError::Overflow)?;

    let admin_state = &mut ctx.accounts.admin_state;
    if admin_state.owner == Pubkey::default() {
        admin_state.owner = ctx.accounts.admin.key();
        admin_state.bump = ctx.bumps.admin_state;
    }
    admin_state.last_profit_withdraw_ts = now;

    transfer_from_pool_vault(
        &ctx.accounts.profit_pool,
        &ctx.accounts.pool_vault,
        &ctx.accounts.admin_token_account,
        &ctx.accounts.token_program,
        amount,
    )?;

    emit!(ProfitWithdrawn {
        recipient: ctx.accounts.admin.key(),
        amount,
        timestamp: now,
    });
    Ok(())
}

/// Single-step emergency drain, permanently disabled in favor of the
/// two-phase request/execute path below.
pub fn emergency_withdraw(_ctx: Context<EmergencyWithdraw>) -> Result<()> {
    Err(LedgerError::EmergencyWithdrawDisabled.into())
}

pub fn request_emergency_withdraw(ctx: Context<RequestEmergencyWithdraw>) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let pool = &mut ctx.accounts.profit_pool;
    let id = pool
        .request_count
        .checked_add(1)
        .ok_or(LedgerError::Overflow)?;

    let request = &mut ctx.accounts.request;
    request.id = id;
    request.recipient = ctx.accounts.recipient.key();
    request.amount = ctx.accounts.pool_vault.amount;
    request.execute_after = now
        .checked_add(EMERGENCY_WITHDRAW_TIMELOCK)
        .ok_or(LedgerError::Overflow)?;
    request.requested_by = ctx.accounts.admin.key();
    request.bump = ctx.bumps.request;

    pool.request_count = id;

    emit!(EmergencyWithdrawRequested {
        request_id: id,
        recipient: request.recipient,
        amount: request.amount,
        execute_after: request.execute_after,
    });

    msg!("emergency withdrawal {} requested for {}", id, request.recipient);
    Ok(())
}

/// Executes a pending request: only after the timelock, only to the exact
/// recipient recorded at request time, and only once (the record is closed).
pub fn execute_emergency_withdraw(
    ctx: Context<ExecuteEmergencyWithdraw>,
    _request_id: u64,
) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let request = &ctx.accounts.request;
    request.executable(now, ctx.accounts.recipient_token_account.owner)?;

    let amount = request.amount;
    let request_id = request.id;
    let vault_after = ctx
        .accounts
        .pool_vault
        .amount
        .checked_sub(amount)
        .ok_or(LedgerError::InsufficientReserve)?;

    let pool = &mut ctx.accounts.profit_pool;
    pool.total_withdrawn = pool
        .total_withdrawn
        .checked_add(amount as u128)
        .ok_or(LedgerError::Overflow)?;
    // the drain bypasses per-asset bookkeeping; the tracked total must not be
    // left claiming tokens the vault no longer holds
    pool.clamp_reserved(vault_after);

    transfer_from_pool_vault(
        &ctx.accounts.profit_pool,
        &ctx.accounts.pool_vault,
        &ctx.accounts.recipient_token_account,
        &ctx.accounts.token_program,
        amount,
    )?;

    emit!(EmergencyWithdrawExecuted {
        request_id,
        recipient: ctx.accounts.recipient_token_account.owner,
        amount,
        timestamp: now,
    });
    Ok(())
}

fn transfer_from_pool_vault<'info>(
    profit_pool: &Account<'info, ProfitPool>,
    pool_vault: &Account<'info, TokenAccount>,
    to: &Account<'info, TokenAccount>,
    token_program: &Program<'info, Token>,
    amount: u64,
) -> Result<()> {
    let seeds: &[&[u8]] = &[b"profit_pool", &[profit_pool.bump]];
    let signer = &[seeds];
    let cpi_accounts = Transfer {
        from: pool_vault.to_account_info(),
        to: to.to_account_info(),
        authority: profit_pool.to_account_info(),
    };
    token::transfer(
        CpiContext::new_with_signer(token_program.to_account_info(), cpi_accounts, signer),
        amount,
    )
}

#[derive(Accounts)]
pub struct DepositProfit<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, Config>,

    pub asset: Account<'info, Asset>,

    #[account(
        mut,
        constraint = reserve.asset_id == asset.id @ LedgerError::InvalidConfig
    )]
    pub reserve: Account<'info, AssetReserve>,

    #[account(mut, seeds = [b"profit_pool"], bump = profit_pool.bump)]
    pub profit_pool: Account<'info, ProfitPool>,

    #[account(mut, seeds = [b"pool_vault"], bump)]
    pub pool_vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub depositor: Signer<'info>,

    #[account(
        mut,
        constraint = depositor_token_account.mint == config.stable_mint @ LedgerError::InvalidConfig
    )]
    pub depositor_token_account: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct WithdrawAssetProfit<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = operator @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    pub asset: Account<'info, Asset>,

    #[account(
        mut,
        constraint = reserve.asset_id == asset.id @ LedgerError::InvalidConfig
    )]
    pub reserve: Account<'info, AssetReserve>,

    #[account(mut, seeds = [b"profit_pool"], bump = profit_pool.bump)]
    pub profit_pool: Account<'info, ProfitPool>,

    #[account(mut, seeds = [b"pool_vault"], bump)]
    pub pool_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = recipient_token_account.mint == config.stable_mint @ LedgerError::InvalidConfig
    )]
    pub recipient_token_account: Account<'info, TokenAccount>,

    #[account(
        init_if_needed,
        payer = operator,
        space = UserState::LEN,
        seeds = [b"user", recipient_token_account.owner.as_ref()],
        bump
    )]
    pub recipient_state: Account<'info, UserState>,

    #[account(mut)]
    pub operator: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct WithdrawProfit<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(
        seeds = [b"parameters"],
        bump = params.bump,
        seeds::program = rwa_params::ID
    )]
    pub params: Account<'info, rwa_params::Parameters>,

    #[account(mut, seeds = [b"profit_pool"], bump = profit_pool.bump)]
    pub profit_pool: Account<'info, ProfitPool>,

    #[account(mut, seeds = [b"pool_vault"], bump)]
    pub pool_vault: Account<'info, TokenAccount>,

    #[account(
        init_if_needed,
        payer = admin,
        space = UserState::LEN,
        seeds = [b"user", admin.key().as_ref()],
        bump
    )]
    pub admin_state: Account<'info, UserState>,

    #[account(
        mut,
        constraint = admin_token_account.mint == config.stable_mint @ LedgerError::InvalidConfig
    )]
    pub admin_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct EmergencyWithdraw<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,
    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct RequestEmergencyWithdraw<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(mut, seeds = [b"profit_pool"], bump = profit_pool.bump)]
    pub profit_pool: Account<'info, ProfitPool>,

    #[account(seeds = [b"pool_vault"], bump)]
    pub pool_vault: Account<'info, TokenAccount>,

    #[account(
        init,
        payer = admin,
        space = EmergencyRequest::LEN,
        seeds = [b"emergency", &(profit_pool.request_count + 1).to_le_bytes()[..]],
        bump
    )]
    pub request: Account<'info, EmergencyRequest>,

    /// CHECK: recorded for exact-match verification at execution time
    pub recipient: UncheckedAccount<'info>,

    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
#[instruction(request_id: u64)]
pub struct ExecuteEmergencyWithdraw<'info> {
    #[account(seeds = [b"config"], bump = config.bump)]
    pub config: Account<'info, Config>,

    #[account(mut, seeds = [b"profit_pool"], bump = profit_pool.bump)]
    pub profit_pool: Account<'info, ProfitPool>,

    #[account(mut, seeds = [b"pool_vault"], bump)]
    pub pool_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        close = requester,
        seeds = [b"emergency", &request_id.to_le_bytes()],
        bump = request.bump,
        constraint = request.requested_by == requester.key() @ LedgerError::Unauthorized
    )]
    pub request: Account<'info, EmergencyRequest>,

    #[account(
        mut,
        constraint = recipient_token_account.mint == config.stable_mint @ LedgerError::InvalidConfig
    )]
    pub recipient_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub requester: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[event]
pub struct ProfitDeposited {
    pub asset_id: u64,
    pub depositor: Pubkey,
    pub amount: u64,
    pub reserve_balance: u64,
}

#[event]
pub struct AssetProfitWithdrawn {
    pub asset_id: u64,
    pub recipient: Pubkey,
    pub amount: u64,
    pub reserve_balance: u64,
}

#[event]
pub struct ProfitWithdrawn {
    pub recipient: Pubkey,
    pub amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct EmergencyWithdrawRequested {
    pub request_id: u64,
    pub recipient: Pubkey,
    pub amount: u64,
    pub execute_after: i64,
}

#[event]
pub struct EmergencyWithdrawExecuted {
    pub request_id: u64,
    pub recipient: Pubkey,
    pub amount: u64,
    pub timestamp: i64,
}
