use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

pub mod invest;
pub mod math;
pub mod pool;
pub mod registry;
pub mod state;

use invest::*;
use pool::*;
use registry::*;
use state::*;

declare_id!("9XjXYmL9TLB3FuszEuXCTkjC6a4vHZ5TPWczyNMLKHRg");

/// Mandatory delay between requesting and executing an emergency withdrawal
pub const EMERGENCY_WITHDRAW_TIMELOCK: i64 = 48 * 60 * 60;

#[program]
pub mod rwa_ledger {
    use super::*;

    /// Create the config, the profit pool and both program vaults
    pub fn initialize(ctx: Context<Initialize>, operator: Pubkey) -> Result<()> {
        require!(operator != Pubkey::default(), LedgerError::InvalidConfig);

        let config = &mut ctx.accounts.config;
        config.admin = ctx.accounts.admin.key();
        config.operator = operator;
        config.stable_mint = ctx.accounts.stable_mint.key();
        config.paused = false;
        config.whitelist_enabled = false;
        config.total_assets = 0;
        config.total_investments = 0;
        config.bump = ctx.bumps.config;

        let profit_pool = &mut ctx.accounts.profit_pool;
        profit_pool.total_deposited = 0;
        profit_pool.total_withdrawn = 0;
        profit_pool.total_reserved = 0;
        profit_pool.request_count = 0;
        profit_pool.bump = ctx.bumps.profit_pool;

        msg!("ledger initialized for mint {}", config.stable_mint);
        Ok(())
    }

    /// Pause/resume position creation and fund movement (only admin)
    pub fn set_paused(ctx: Context<AdminOnly>, paused: bool) -> Result<()> {
        let config = &mut ctx.accounts.config;
        require!(config.paused != paused, LedgerError::InvalidConfig);
        config.paused = paused;
        msg!("paused set to {}", paused);
        Ok(())
    }

    /// Rotate the operator allowed on the asset-scoped withdrawal path
    pub fn set_operator(ctx: Context<AdminOnly>, new_operator: Pubkey) -> Result<()> {
        require!(new_operator != Pubkey::default(), LedgerError::InvalidConfig);
        ctx.accounts.config.operator = new_operator;
        msg!("operator set to {}", new_operator);
        Ok(())
    }

    /// Flip an account's blacklist flag (only admin)
    pub fn set_blacklist(ctx: Context<SetUserAccess>, blacklisted: bool) -> Result<()> {
        let user_state = &mut ctx.accounts.user_state;
        if user_state.owner == Pubkey::default() {
            user_state.owner = ctx.accounts.user.key();
            user_state.bump = ctx.bumps.user_state;
        }
        user_state.blacklisted = blacklisted;
        msg!("blacklist[{}] = {}", user_state.owner, blacklisted);
        Ok(())
    }

    /// Flip an account's whitelist flag (only admin); enforced on invest and
    /// redeem only while `whitelist_enabled` is set on the config
    pub fn set_whitelist(ctx: Context<SetUserAccess>, whitelisted: bool) -> Result<()> {
        let user_state = &mut ctx.accounts.user_state;
        if user_state.owner == Pubkey::default() {
            user_state.owner = ctx.accounts.user.key();
            user_state.bump = ctx.bumps.user_state;
        }
        user_state.whitelisted = whitelisted;
        msg!("whitelist[{}] = {}", user_state.owner, whitelisted);
        Ok(())
    }

    /// Switch whitelist enforcement on or off (only admin)
    pub fn set_whitelist_enabled(ctx: Context<AdminOnly>, enabled: bool) -> Result<()> {
        let config = &mut ctx.accounts.config;
        require!(config.whitelist_enabled != enabled, LedgerError::InvalidConfig);
        config.whitelist_enabled = enabled;
        msg!("whitelist enforcement set to {}", enabled);
        Ok(())
    }

    // --- Asset registry ---

    /// Register a new investable product (only admin)
    pub fn add_asset(ctx: Context<AddAsset>, params: AddAssetParams) -> Result<()> {
        registry::add_asset(ctx, params)
    }

    /// Active -> Inactive
    pub fn disable_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
        registry::disable_asset(ctx)
    }

    /// Inactive -> Active
    pub fn enable_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
        registry::enable_asset(ctx)
    }

    /// Active -> Completed
    pub fn complete_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
        registry::complete_asset(ctx)
    }

    /// {Inactive, Completed} -> Deprecated
    pub fn deprecate_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
        registry::deprecate_asset(ctx)
    }

    /// View: would this investment be admissible right now?
    pub fn validate_investment(ctx: Context<ValidateInvestment>, amount: u64) -> Result<bool> {
        registry::validate_investment(ctx, amount)
    }

    // --- Investment manager ---

    /// Open a fixed-term position (self-service)
    pub fn invest(ctx: Context<Invest>, amount: u64) -> Result<()> {
        invest::invest(ctx, amount)
    }

    /// View: profit owed to a position as of now
    pub fn calculate_profit(ctx: Context<CalculateProfit>) -> Result<u64> {
        invest::calculate_profit(ctx)
    }

    /// Settle a matured position (only the owning investor)
    pub fn redeem(ctx: Context<Redeem>) -> Result<()> {
        invest::redeem(ctx)
    }

    /// Unwind an active position without yield (only admin)
    pub fn emergency_cancel(ctx: Context<EmergencyCancel>) -> Result<()> {
        invest::emergency_cancel(ctx)
    }

    // --- Profit pool ---

    /// Top up an asset's profit reserve (permissionless)
    pub fn deposit_profit(ctx: Context<DepositProfit>, amount: u64) -> Result<()> {
        pool::deposit_profit(ctx, amount)
    }

    /// Draw from an asset's reserve straight to a recipient (only operator)
    pub fn withdraw_asset_profit(ctx: Context<WithdrawAssetProfit>, amount: u64) -> Result<()> {
        pool::withdraw_asset_profit(ctx, amount)
    }

    /// Draw unallocated surplus above the reserve floor (only admin, cooldown)
    pub fn withdraw_profit(ctx: Context<WithdrawProfit>, amount: u64) -> Result<()> {
        pool::withdraw_profit(ctx, amount)
    }

    /// Permanently disabled; kept so callers get a descriptive failure
    pub fn emergency_withdraw(ctx: Context<EmergencyWithdraw>) -> Result<()> {
        pool::emergency_withdraw(ctx)
    }

    /// Phase one of the timelocked emergency drain (only admin)
    pub fn request_emergency_withdraw(ctx: Context<RequestEmergencyWithdraw>) -> Result<()> {
        pool::request_emergency_withdraw(ctx)
    }

    /// Phase two: execute after the timelock, to the recorded recipient only
    pub fn execute_emergency_withdraw(
        ctx: Context<ExecuteEmergencyWithdraw>,
        request_id: u64,
    ) -> Result<()> {
        pool::execute_emergency_withdraw(ctx, request_id)
    }
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(
        init,
        payer = admin,
        space = Config::LEN,
        seeds = [b"config"],
        bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        init,
        payer = admin,
        space = ProfitPool::LEN,
        seeds = [b"profit_pool"],
        bump
    )]
    pub profit_pool: Account<'info, ProfitPool>,

    pub stable_mint: Account<'info, Mint>,

    #[account(
        init,
        payer = admin,
        seeds = [b"principal_vault"],
        bump,
        token::mint = stable_mint,
        token::authority = config
    )]
    pub principal_vault: Account<'info, TokenAccount>,

    #[account(
        init,
        payer = admin,
        seeds = [b"pool_vault"],
        bump,
        token::mint = stable_mint,
        token::authority = profit_pool
    )]
    pub pool_vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct AdminOnly<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,
    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetUserAccess<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    /// CHECK: only this account's key is used, as the user-state seed
    pub user: UncheckedAccount<'info>,

    #[account(
        init_if_needed,
        payer = admin,
        space = UserState::LEN,
        seeds = [b"user", user.key().as_ref()],
        bump
    )]
    pub user_state: Account<'info, UserState>,

    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}
