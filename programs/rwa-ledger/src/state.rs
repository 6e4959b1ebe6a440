use anchor_lang::prelude::*;

use crate::math;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_ISSUER_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 128;

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssetStatus {
    Inactive,
    Active,
    Completed,
    Deprecated,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum InvestmentStatus {
    Active,
    Completed,
    Cancelled,
}

#[account]
pub struct Config {
    pub admin: Pubkey,
    /// Address allowed to drive the asset-scoped reserve withdrawal path
    pub operator: Pubkey,
    pub stable_mint: Pubkey,
    pub paused: bool,
    /// When set, invest/redeem additionally require the caller's whitelist flag
    pub whitelist_enabled: bool,
    /// Sequential 1-based id counters; 0 is never a valid id
    pub total_assets: u64,
    pub total_investments: u64,
    pub bump: u8,
}

impl Config {
    pub const LEN: usize = 8 + // discriminator
        32 + // admin
        32 + // operator
        32 + // stable_mint
        1 +  // paused
        1 +  // whitelist_enabled
        8 +  // total_assets
        8 +  // total_investments
        1;   // bump
}

#[account]
pub struct Asset {
    pub id: u64,
    pub name: String,
    pub issuer: String,
    pub description: String,
    /// Fixed annual yield in basis points (base 10_000); always > 0
    pub apy_bps: u64,
    /// Hard cap on aggregate committed principal
    pub max_amount: u64,
    /// Aggregate principal currently committed; never exceeds max_amount
    pub current_amount: u64,
    pub min_investment: u64,
    pub max_investment: u64,
    /// Fixed term length in seconds; always > 0
    pub period_secs: i64,
    pub status: AssetStatus,
    pub added_at: i64,
    pub bump: u8,
}

impl Asset {
    pub const LEN: usize = 8 + // discriminator
        8 +  // id
        4 + MAX_NAME_LEN +
        4 + MAX_ISSUER_LEN +
        4 + MAX_DESCRIPTION_LEN +
        8 +  // apy_bps
        8 +  // max_amount
        8 +  // current_amount
        8 +  // min_investment
        8 +  // max_investment
        8 +  // period_secs
        1 +  // status
        8 +  // added_at
        1;   // bump

    /// Admissibility predicate for a proposed investment. Returns false
    /// instead of failing; the invest handler re-derives each failure reason
    /// with its own explicit requires.
    pub fn validate_investment(&self, amount: u64) -> bool {
        self.status == AssetStatus::Active
            && amount >= self.min_investment
            && amount <= self.max_investment
            && self
                .current_amount
                .checked_add(amount)
                .map_or(false, |next| next <= self.max_amount)
    }

    /// Reserve capacity for newly committed principal. The only way
    /// current_amount goes up; reachable only from invest.
    pub(crate) fn commit_capacity(&mut self, amount: u64) -> Result<()> {
        let next = self
            .current_amount
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        require!(next <= self.max_amount, LedgerError::CapacityExceeded);
        self.current_amount = next;
        Ok(())
    }

    /// Release capacity when a position leaves Active state. Never called on
    /// profit payment alone.
    pub(crate) fn release_capacity(&mut self, amount: u64) -> Result<()> {
        require!(
            self.current_amount >= amount,
            LedgerError::CapacityUnderflow
        );
        self.current_amount -= amount;
        Ok(())
    }

    pub(crate) fn disable(&mut self) -> Result<()> {
        require!(
            self.status == AssetStatus::Active,
            LedgerError::InvalidStatusTransition
        );
        self.status = AssetStatus::Inactive;
        Ok(())
    }

    pub(crate) fn enable(&mut self) -> Result<()> {
        require!(
            self.status == AssetStatus::Inactive,
            LedgerError::InvalidStatusTransition
        );
        self.status = AssetStatus::Active;
        Ok(())
    }

    pub(crate) fn complete(&mut self) -> Result<()> {
        require!(
            self.status == AssetStatus::Active,
            LedgerError::InvalidStatusTransition
        );
        self.status = AssetStatus::Completed;
        Ok(())
    }

    pub(crate) fn deprecate(&mut self) -> Result<()> {
        require!(
            matches!(self.status, AssetStatus::Inactive | AssetStatus::Completed),
            LedgerError::InvalidStatusTransition
        );
        self.status = AssetStatus::Deprecated;
        Ok(())
    }
}

/// Per-asset profit sub-balance. Increased only by deposits, decreased only
/// by withdrawals and redemptions.
#[account]
pub struct AssetReserve {
    pub asset_id: u64,
    pub balance: u64,
    pub bump: u8,
}

impl AssetReserve {
    pub const LEN: usize = 8 + // discriminator
        8 +  // asset_id
        8 +  // balance
        1;   // bump

    pub(crate) fn credit(&mut self, amount: u64) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    pub(crate) fn debit(&mut self, amount: u64) -> Result<()> {
        require!(self.balance >= amount, LedgerError::InsufficientReserve);
        self.balance -= amount;
        Ok(())
    }
}

#[account]
pub struct ProfitPool {
    /// Monotonic audit counters over the life of the pool
    pub total_deposited: u128,
    pub total_withdrawn: u128,
    /// Sum of all per-asset reserve balances; the vault must always hold at
    /// least this much, so the generic path can only draw unallocated surplus
    pub total_reserved: u64,
    pub request_count: u64,
    pub bump: u8,
}

impl ProfitPool {
    pub const LEN: usize = 8 + // discriminator
        16 + // total_deposited
        16 + // total_withdrawn
        8 +  // total_reserved
        8 +  // request_count
        1;   // bump

    /// Re-anchor the tracked reserve total to what the vault actually holds.
    /// Called after an emergency drain, which moves real tokens without going
    /// through the per-asset bookkeeping.
    pub(crate) fn clamp_reserved(&mut self, vault_balance: u64) {
        if self.total_reserved > vault_balance {
            self.total_reserved = vault_balance;
        }
    }
}

#[account]
pub struct Investment {
    pub id: u64,
    pub investor: Pubkey,
    pub asset_id: u64,
    pub amount: u64,
    pub start_ts: i64,
    /// start_ts + the asset period at creation; later period changes on the
    /// asset never move this
    pub end_ts: i64,
    /// APY snapshot at creation; later rate changes never touch the position
    pub apy_bps: u64,
    pub status: InvestmentStatus,
    pub profit: u64,
    pub claimed_profit: u64,
    pub bump: u8,
}

impl Investment {
    pub const LEN: usize = 8 + // discriminator
        8 +  // id
        32 + // investor
        8 +  // asset_id
        8 +  // amount
        8 +  // start_ts
        8 +  // end_ts
        8 +  // apy_bps
        1 +  // status
        8 +  // profit
        8 +  // claimed_profit
        1;   // bump

    /// Profit owed as of `now`. Accrual caps at maturity; settled positions
    /// return 0 here and carry their frozen `profit` field instead.
    pub fn accrued_profit(&self, now: i64, min_daily_profit_bps: u64) -> Result<u64> {
        if self.status != InvestmentStatus::Active {
            return Ok(0);
        }
        let elapsed = now.min(self.end_ts).saturating_sub(self.start_ts).max(0) as u64;
        math::profit_with_floor(self.amount, self.apy_bps, elapsed, min_daily_profit_bps)
    }

    pub(crate) fn settle(&mut self, profit: u64) -> Result<()> {
        require!(
            self.status == InvestmentStatus::Active,
            LedgerError::InvestmentNotActive
        );
        self.status = InvestmentStatus::Completed;
        self.profit = profit;
        self.claimed_profit = profit;
        Ok(())
    }

    /// Unwind without any yield; the profit fields stay zero.
    pub(crate) fn cancel(&mut self) -> Result<()> {
        require!(
            self.status == InvestmentStatus::Active,
            LedgerError::InvestmentNotActive
        );
        self.status = InvestmentStatus::Cancelled;
        Ok(())
    }
}

#[account]
pub struct UserState {
    pub owner: Pubkey,
    pub blacklisted: bool,
    pub whitelisted: bool,
    pub last_redeem_ts: i64,
    pub last_profit_withdraw_ts: i64,
    pub investment_count: u64,
    pub bump: u8,
}

impl UserState {
    pub const LEN: usize = 8 + // discriminator
        32 + // owner
        1 +  // blacklisted
        1 +  // whitelisted
        8 +  // last_redeem_ts
        8 +  // last_profit_withdraw_ts
        8 +  // investment_count
        1;   // bump

    /// Access filter on invest/redeem: the blacklist always applies, the
    /// whitelist only while enforcement is switched on. Handlers re-derive
    /// each half with its own error code.
    pub fn access_ok(&self, whitelist_enabled: bool) -> bool {
        !self.blacklisted && (!whitelist_enabled || self.whitelisted)
    }

    pub fn redeem_cooldown_ok(&self, now: i64, cooldown_secs: i64) -> bool {
        self.last_redeem_ts == 0 || now.saturating_sub(self.last_redeem_ts) >= cooldown_secs
    }

    pub fn withdraw_cooldown_ok(&self, now: i64, cooldown_secs: i64) -> bool {
        self.last_profit_withdraw_ts == 0
            || now.saturating_sub(self.last_profit_withdraw_ts) >= cooldown_secs
    }
}

/// Two-phase emergency withdrawal record. Consumed (the account is closed)
/// on successful execution; there is no cancellation path, a stale request
/// simply stays executable by its original requester.
#[account]
pub struct EmergencyRequest {
    pub id: u64,
    pub recipient: Pubkey,
    /// Snapshot of the pool vault balance at request time
    pub amount: u64,
    pub execute_after: i64,
    pub requested_by: Pubkey,
    pub bump: u8,
}

impl EmergencyRequest {
    pub const LEN: usize = 8 + // discriminator
        8 +  // id
        32 + // recipient
        8 +  // amount
        8 +  // execute_after
        32 + // requested_by
        1;   // bump

    /// Both gates at once: timelock elapsed and exact recipient match.
    pub fn executable(&self, now: i64, recipient: Pubkey) -> Result<()> {
        require!(now >= self.execute_after, LedgerError::TimelockActive);
        require_keys_eq!(recipient, self.recipient, LedgerError::RecipientMismatch);
        Ok(())
    }
}

#[error_code]
pub enum LedgerError {
    #[msg("Invalid configuration")]
    InvalidConfig,
    #[msg("Unauthorized")]
    Unauthorized,
    #[msg("Program is paused")]
    Paused,
    #[msg("Account is blacklisted")]
    Blacklisted,
    #[msg("Account is not whitelisted")]
    NotWhitelisted,
    #[msg("Amount must be greater than zero")]
    InvalidAmount,
    #[msg("Asset is not active")]
    AssetNotActive,
    #[msg("Invalid asset status transition")]
    InvalidStatusTransition,
    #[msg("Amount below minimum investment")]
    BelowMinInvestment,
    #[msg("Amount above maximum investment")]
    AboveMaxInvestment,
    #[msg("Asset capacity exceeded")]
    CapacityExceeded,
    #[msg("Release exceeds committed capacity")]
    CapacityUnderflow,
    #[msg("Investment is not active")]
    InvestmentNotActive,
    #[msg("Investment has not matured")]
    NotMatured,
    #[msg("Cooldown has not elapsed")]
    CooldownActive,
    #[msg("Insufficient profit reserve")]
    InsufficientReserve,
    #[msg("Withdrawal would breach the reserve floor")]
    ReserveFloorBreached,
    #[msg("Arithmetic overflow")]
    Overflow,
    #[msg("Single-step emergency withdrawal is disabled")]
    EmergencyWithdrawDisabled,
    #[msg("Emergency timelock has not elapsed")]
    TimelockActive,
    #[msg("Recipient does not match the original request")]
    RecipientMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn asset() -> Asset {
        Asset {
            id: 1,
            name: "US T-Bill 12M".to_string(),
            issuer: "Acme Capital".to_string(),
            description: String::new(),
            apy_bps: 1_000,
            max_amount: 1_000_000,
            current_amount: 0,
            min_investment: 10,
            max_investment: 10_000,
            period_secs: 86_400,
            status: AssetStatus::Active,
            added_at: 0,
            bump: 255,
        }
    }

    fn investment(amount: u64, start_ts: i64, period_secs: i64, apy_bps: u64) -> Investment {
        Investment {
            id: 1,
            investor: Pubkey::new_unique(),
            asset_id: 1,
            amount,
            start_ts,
            end_ts: start_ts + period_secs,
            apy_bps,
            status: InvestmentStatus::Active,
            profit: 0,
            claimed_profit: 0,
            bump: 255,
        }
    }

    #[test]
    fn validate_investment_checks_every_gate() {
        let mut a = asset();
        assert!(a.validate_investment(100));
        assert!(a.validate_investment(10));
        assert!(a.validate_investment(10_000));
        assert!(!a.validate_investment(9));
        assert!(!a.validate_investment(10_001));

        a.status = AssetStatus::Inactive;
        assert!(!a.validate_investment(100));

        let mut a = asset();
        a.current_amount = a.max_amount - 50;
        assert!(a.validate_investment(50));
        assert!(!a.validate_investment(51));
    }

    #[test]
    fn capacity_commit_and_release_enforce_bounds() {
        let mut a = asset();
        a.commit_capacity(600_000).unwrap();
        a.commit_capacity(400_000).unwrap();
        assert_eq!(a.current_amount, a.max_amount);
        assert!(a.commit_capacity(1).is_err());

        a.release_capacity(1_000_000).unwrap();
        assert_eq!(a.current_amount, 0);
        assert!(a.release_capacity(1).is_err());
    }

    proptest! {
        // randomized commit/release sequences never leave the capacity window
        #[test]
        fn capacity_invariant_holds_under_random_sequences(
            ops in proptest::collection::vec((any::<bool>(), 1u64..200_000), 0..64)
        ) {
            let mut a = asset();
            for (release, amount) in ops {
                if release {
                    let _ = a.release_capacity(amount);
                } else {
                    let _ = a.commit_capacity(amount);
                }
                prop_assert!(a.current_amount <= a.max_amount);
            }
        }
    }

    #[test]
    fn asset_status_transitions_are_explicit_and_one_way() {
        let mut a = asset();
        a.disable().unwrap();
        assert_eq!(a.status, AssetStatus::Inactive);
        assert!(a.disable().is_err());

        a.enable().unwrap();
        assert_eq!(a.status, AssetStatus::Active);
        assert!(a.enable().is_err());
        assert!(a.deprecate().is_err());

        a.complete().unwrap();
        assert_eq!(a.status, AssetStatus::Completed);
        assert!(a.complete().is_err());
        assert!(a.disable().is_err());
        assert!(a.enable().is_err());

        a.deprecate().unwrap();
        assert_eq!(a.status, AssetStatus::Deprecated);
        assert!(a.enable().is_err());
        assert!(a.deprecate().is_err());
    }

    #[test]
    fn accrual_caps_at_maturity_and_is_monotonic() {
        let inv = investment(5_000_000_000, 1_000, 30 * 86_400, 850);
        let mut previous = 0;
        for now in (1_000..1_000 + 40 * 86_400).step_by(6_000) {
            let profit = inv.accrued_profit(now, 0).unwrap();
            assert!(profit >= previous);
            previous = profit;
        }
        let at_maturity = inv.accrued_profit(inv.end_ts, 0).unwrap();
        assert_eq!(inv.accrued_profit(inv.end_ts + 86_400, 0).unwrap(), at_maturity);
        assert_eq!(inv.accrued_profit(i64::MAX, 0).unwrap(), at_maturity);
    }

    #[test]
    fn settled_positions_accrue_nothing_further() {
        let mut inv = investment(5_000_000_000, 0, 86_400, 1_000);
        inv.settle(1_234).unwrap();
        assert_eq!(inv.status, InvestmentStatus::Completed);
        assert_eq!(inv.profit, 1_234);
        assert_eq!(inv.claimed_profit, 1_234);
        assert_eq!(inv.accrued_profit(i64::MAX, 0).unwrap(), 0);

        // no double settlement, no transition out of a terminal state
        assert!(inv.settle(9_999).is_err());
        assert!(inv.cancel().is_err());
        assert_eq!(inv.profit, 1_234);

        let mut inv = investment(100, 0, 86_400, 1_000);
        inv.cancel().unwrap();
        assert_eq!(inv.status, InvestmentStatus::Cancelled);
        assert_eq!(inv.profit, 0);
        assert!(inv.settle(1).is_err());
        assert!(inv.cancel().is_err());
    }

    #[test]
    fn access_filter_combines_blacklist_and_optional_whitelist() {
        let mut user = UserState {
            owner: Pubkey::new_unique(),
            blacklisted: false,
            whitelisted: false,
            last_redeem_ts: 0,
            last_profit_withdraw_ts: 0,
            investment_count: 0,
            bump: 255,
        };
        // whitelist enforcement off: only the blacklist matters
        assert!(user.access_ok(false));
        user.blacklisted = true;
        assert!(!user.access_ok(false));

        // enforcement on: the flag is required, and the blacklist still wins
        user.blacklisted = false;
        assert!(!user.access_ok(true));
        user.whitelisted = true;
        assert!(user.access_ok(true));
        user.blacklisted = true;
        assert!(!user.access_ok(true));
    }

    #[test]
    fn reserved_total_reanchors_to_vault_after_drain() {
        let mut pool = ProfitPool {
            total_deposited: 10_000,
            total_withdrawn: 0,
            total_reserved: 7_500,
            request_count: 1,
            bump: 255,
        };
        // vault still covers the tracked reserves: no change
        pool.clamp_reserved(9_000);
        assert_eq!(pool.total_reserved, 7_500);

        // a full drain leaves nothing backing the reserves
        pool.clamp_reserved(0);
        assert_eq!(pool.total_reserved, 0);

        // partial drain clamps to exactly what remains
        pool.total_reserved = 7_500;
        pool.clamp_reserved(300);
        assert_eq!(pool.total_reserved, 300);
    }

    #[test]
    fn redeem_cooldown_is_a_closed_lower_bound() {
        let mut user = UserState {
            owner: Pubkey::new_unique(),
            blacklisted: false,
            whitelisted: false,
            last_redeem_ts: 0,
            last_profit_withdraw_ts: 0,
            investment_count: 0,
            bump: 255,
        };
        // never redeemed before: always ok
        assert!(user.redeem_cooldown_ok(5, 3_600));

        user.last_redeem_ts = 10_000;
        assert!(!user.redeem_cooldown_ok(10_000 + 3_599, 3_600));
        assert!(user.redeem_cooldown_ok(10_000 + 3_600, 3_600));
        assert!(user.redeem_cooldown_ok(10_000 + 3_601, 3_600));
    }

    #[test]
    fn emergency_request_gates_timelock_then_recipient() {
        let recipient = Pubkey::new_unique();
        let request = EmergencyRequest {
            id: 1,
            recipient,
            amount: 500,
            execute_after: 100_000,
            requested_by: Pubkey::new_unique(),
            bump: 255,
        };
        assert!(request.executable(99_999, recipient).is_err());
        assert!(request.executable(100_000, Pubkey::new_unique()).is_err());
        assert!(request.executable(100_000, recipient).is_ok());
    }

    #[test]
    fn reserve_conservation_across_deposits_and_withdrawals() {
        let mut reserve = AssetReserve { asset_id: 1, balance: 0, bump: 255 };
        let mut deposited: u64 = 0;
        let mut withdrawn: u64 = 0;

        for amount in [50, 1_000, 7, 320] {
            reserve.credit(amount).unwrap();
            deposited += amount;
        }
        for amount in [30, 900] {
            reserve.debit(amount).unwrap();
            withdrawn += amount;
        }
        assert_eq!(reserve.balance, deposited - withdrawn);
        // a debit past the tracked balance is refused outright
        assert!(reserve.debit(reserve.balance + 1).is_err());
        assert_eq!(reserve.balance, deposited - withdrawn);
    }

    // The full accounting lifecycle from the redemption side, pure state:
    // register, invest, fund the reserve, mature, settle.
    #[test]
    fn end_to_end_settlement_scenario() {
        let mut a = asset();
        let mut reserve = AssetReserve { asset_id: 1, balance: 0, bump: 255 };

        let principal = 100;
        assert!(a.validate_investment(principal));
        a.commit_capacity(principal).unwrap();
        let mut inv = investment(principal, 0, a.period_secs, a.apy_bps);

        reserve.credit(50).unwrap();

        let now = a.period_secs + 1;
        assert!(now >= inv.end_ts);
        let profit = inv.accrued_profit(now, 0).unwrap();
        // closed form: 100 * 1000 * 86400 / (31_536_000 * 10_000), truncated
        assert_eq!(profit, 100 * 1_000 * 86_400 / (31_536_000 * 10_000));
        assert!(reserve.balance >= profit);

        inv.settle(profit).unwrap();
        a.release_capacity(principal).unwrap();
        if profit > 0 {
            reserve.debit(profit).unwrap();
        }

        assert_eq!(a.current_amount, 0);
        assert_eq!(inv.status, InvestmentStatus::Completed);
        assert!(inv.settle(profit).is_err());

        // same flow with a realistically sized position pays real profit
        let principal = 100_000_000;
        let mut inv = investment(principal, 0, a.period_secs, a.apy_bps);
        reserve.credit(50_000).unwrap();
        let profit = inv.accrued_profit(a.period_secs + 1, 0).unwrap();
        assert_eq!(profit, 27_397);
        reserve.debit(profit).unwrap();
        inv.settle(profit).unwrap();
        assert_eq!(inv.claimed_profit, 27_397);
    }
}
