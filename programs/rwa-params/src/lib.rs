use anchor_lang::prelude::*;

declare_id!("4qNDSGkcnyX9o18U1RrPoMomhyE2j5VXB7e7LfbAE4K7");

#[program]
pub mod rwa_params {
    use super::*;

    /// Create the parameters account with its initial values
    pub fn initialize_parameters(
        ctx: Context<InitializeParameters>,
        config: ParametersConfig,
    ) -> Result<()> {
        config.validate()?;

        let parameters = &mut ctx.accounts.parameters;
        parameters.authority = ctx.accounts.authority.key();
        parameters.investment_cooldown_secs = config.investment_cooldown_secs;
        parameters.profit_withdrawal_cooldown_secs = config.profit_withdrawal_cooldown_secs;
        parameters.min_reserve_floor = config.min_reserve_floor;
        parameters.min_daily_profit_bps = config.min_daily_profit_bps;
        parameters.bump = ctx.bumps.parameters;

        msg!("parameters initialized by {}", parameters.authority);
        Ok(())
    }

    /// Replace the tunable values (only authority). Consumers read the account
    /// on every call, so the new values take effect on the very next one.
    pub fn update_parameters(
        ctx: Context<UpdateParameters>,
        config: ParametersConfig,
    ) -> Result<()> {
        config.validate()?;

        let parameters = &mut ctx.accounts.parameters;
        require_keys_eq!(
            parameters.authority,
            ctx.accounts.authority.key(),
            ParamsError::Unauthorized
        );

        parameters.investment_cooldown_secs = config.investment_cooldown_secs;
        parameters.profit_withdrawal_cooldown_secs = config.profit_withdrawal_cooldown_secs;
        parameters.min_reserve_floor = config.min_reserve_floor;
        parameters.min_daily_profit_bps = config.min_daily_profit_bps;

        msg!("parameters updated");
        Ok(())
    }

    /// Hand the parameters account over to a new authority
    pub fn set_authority(ctx: Context<SetAuthority>, new_authority: Pubkey) -> Result<()> {
        require!(new_authority != Pubkey::default(), ParamsError::InvalidParams);

        let parameters = &mut ctx.accounts.parameters;
        parameters.authority = new_authority;

        msg!("parameters authority set to {}", new_authority);
        Ok(())
    }
}

#[derive(Accounts)]
pub struct InitializeParameters<'info> {
    #[account(
        init,
        payer = authority,
        space = Parameters::LEN,
        seeds = [b"parameters"],
        bump
    )]
    pub parameters: Account<'info, Parameters>,
    #[account(mut)]
    pub authority: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct UpdateParameters<'info> {
    #[account(mut, has_one = authority)]
    pub parameters: Account<'info, Parameters>,
    pub authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetAuthority<'info> {
    #[account(mut, has_one = authority)]
    pub parameters: Account<'info, Parameters>,
    pub authority: Signer<'info>,
}

#[account]
pub struct Parameters {
    pub authority: Pubkey,
    /// Minimum gap between two redemptions by the same position owner
    pub investment_cooldown_secs: i64,
    /// Minimum gap between two generic profit-pool withdrawals by one account
    pub profit_withdrawal_cooldown_secs: i64,
    /// The pool vault may not be drawn below this via the generic path
    pub min_reserve_floor: u64,
    /// Minimum-profit floor threshold in basis points; 0 disables the floor
    pub min_daily_profit_bps: u64,
    pub bump: u8,
}

impl Parameters {
    pub const LEN: usize = 8 + // discriminator
        32 + // authority
        8 +  // investment_cooldown_secs
        8 +  // profit_withdrawal_cooldown_secs
        8 +  // min_reserve_floor
        8 +  // min_daily_profit_bps
        1;   // bump
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct ParametersConfig {
    pub investment_cooldown_secs: i64,
    pub profit_withdrawal_cooldown_secs: i64,
    pub min_reserve_floor: u64,
    pub min_daily_profit_bps: u64,
}

impl ParametersConfig {
    pub fn validate(&self) -> Result<()> {
        require!(self.investment_cooldown_secs >= 0, ParamsError::InvalidParams);
        require!(
            self.profit_withdrawal_cooldown_secs >= 0,
            ParamsError::InvalidParams
        );
        require!(self.min_daily_profit_bps <= 10_000, ParamsError::InvalidParams);
        Ok(())
    }
}

#[error_code]
pub enum ParamsError {
    #[msg("Invalid parameters")]
    InvalidParams,
    #[msg("Unauthorized")]
    Unauthorized,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ParametersConfig {
        ParametersConfig {
            investment_cooldown_secs: 3_600,
            profit_withdrawal_cooldown_secs: 86_400,
            min_reserve_floor: 1_000_000,
            min_daily_profit_bps: 0,
        }
    }

    #[test]
    fn accepts_sane_values() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn rejects_negative_cooldowns() {
        let mut c = config();
        c.investment_cooldown_secs = -1;
        assert!(c.validate().is_err());

        let mut c = config();
        c.profit_withdrawal_cooldown_secs = -1;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_floor_threshold_above_full_bps() {
        let mut c = config();
        c.min_daily_profit_bps = 10_001;
        assert!(c.validate().is_err());
    }
}
