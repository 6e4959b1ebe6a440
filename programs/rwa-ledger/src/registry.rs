//! Asset registry: the catalog of investable products, their terms, and the
//! capacity accounting that gates new positions.

use anchor_lang::prelude::*;

use crate::state::*;

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct AddAssetParams {
    pub name: String,
    pub issuer: String,
    pub description: String,
    pub max_amount: u64,
    pub apy_bps: u64,
    pub min_investment: u64,
    pub max_investment: u64,
    pub period_secs: i64,
}

pub fn add_asset(ctx: Context<AddAsset>, params: AddAssetParams) -> Result<()> {
    require!(
        !params.name.is_empty() && params.name.len() <= MAX_NAME_LEN,
        LedgerError::InvalidConfig
    );
    require!(
        !params.issuer.is_empty() && params.issuer.len() <= MAX_ISSUER_LEN,
        LedgerError::InvalidConfig
    );
    require!(
        params.description.len() <= MAX_DESCRIPTION_LEN,
        LedgerError::InvalidConfig
    );
    require!(params.max_amount > 0, LedgerError::InvalidConfig);
    require!(params.apy_bps > 0, LedgerError::InvalidConfig);
    require!(params.period_secs > 0, LedgerError::InvalidConfig);
    require!(params.min_investment > 0, LedgerError::InvalidConfig);
    require!(
        params.max_investment > params.min_investment,
        LedgerError::InvalidConfig
    );
    require!(
        params.max_amount >= params.max_investment,
        LedgerError::InvalidConfig
    );

    let config = &mut ctx.accounts.config;
    let id = config
        .total_assets
        .checked_add(1)
        .ok_or(LedgerError::Overflow)?;
    let now = Clock::get()?.unix_timestamp;

    let asset = &mut ctx.accounts.asset;
    asset.id = id;
    asset.name = params.name;
    asset.issuer = params.issuer;
    asset.description = params.description;
    asset.apy_bps = params.apy_bps;
    asset.max_amount = params.max_amount;
    asset.current_amount = 0;
    asset.min_investment = params.min_investment;
    asset.max_investment = params.max_investment;
    asset.period_secs = params.period_secs;
    asset.status = AssetStatus::Active;
    asset.added_at = now;
    asset.bump = ctx.bumps.asset;

    let reserve = &mut ctx.accounts.reserve;
    reserve.asset_id = id;
    reserve.balance = 0;
    reserve.bump = ctx.bumps.reserve;

    config.total_assets = id;

    emit!(AssetAdded {
        id,
        apy_bps: asset.apy_bps,
        max_amount: asset.max_amount,
        period_secs: asset.period_secs,
        timestamp: now,
    });

    msg!("asset {} registered", id);
    Ok(())
}

pub fn disable_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
    let asset = &mut ctx.accounts.asset;
    asset.disable()?;
    emit_status_change(asset)
}

pub fn enable_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
    let asset = &mut ctx.accounts.asset;
    asset.enable()?;
    emit_status_change(asset)
}

pub fn complete_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
    let asset = &mut ctx.accounts.asset;
    asset.complete()?;
    emit_status_change(asset)
}

pub fn deprecate_asset(ctx: Context<UpdateAssetStatus>) -> Result<()> {
    let asset = &mut ctx.accounts.asset;
    asset.deprecate()?;
    emit_status_change(asset)
}

fn emit_status_change(asset: &Asset) -> Result<()> {
    emit!(AssetStatusChanged {
        id: asset.id,
        status: asset.status,
        timestamp: Clock::get()?.unix_timestamp,
    });
    Ok(())
}

/// Read-only admissibility check; a predicate, not a gate.
pub fn validate_investment(ctx: Context<ValidateInvestment>, amount: u64) -> Result<bool> {
    Ok(ctx.accounts.asset.validate_investment(amount))
}

#[derive(Accounts)]
pub struct AddAsset<'info> {
    #[account(
        mut,
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(
        init,
        payer = admin,
        space = Asset::LEN,
        seeds = [b"asset", &(config.total_assets + 1).to_le_bytes()[..]],
        bump
    )]
    pub asset: Account<'info, Asset>,

    #[account(
        init,
        payer = admin,
        space = AssetReserve::LEN,
        seeds = [b"reserve", &(config.total_assets + 1).to_le_bytes()[..]],
        bump
    )]
    pub reserve: Account<'info, AssetReserve>,

    #[account(mut)]
    pub admin: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct UpdateAssetStatus<'info> {
    #[account(
        seeds = [b"config"],
        bump = config.bump,
        has_one = admin @ LedgerError::Unauthorized
    )]
    pub config: Account<'info, Config>,

    #[account(mut)]
    pub asset: Account<'info, Asset>,

    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct ValidateInvestment<'info> {
    pub asset: Account<'info, Asset>,
}

#[event]
pub struct AssetAdded {
    pub id: u64,
    pub apy_bps: u64,
    pub max_amount: u64,
    pub period_secs: i64,
    pub timestamp: i64,
}

#[event]
pub struct AssetStatusChanged {
    pub id: u64,
    pub status: AssetStatus,
    pub timestamp: i64,
}
