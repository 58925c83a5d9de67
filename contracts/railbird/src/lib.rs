#![cfg_attr(not(feature = "std"), no_std, no_main)]

/// Fixed-point parts-per-million arithmetic shared by every staking formula.
///
/// All ownership fractions and fee multipliers are expressed in PPM, where
/// `1_000_000` is unity (100%). Integer division truncates; callers depend on
/// that truncation, so none of these helpers round.
pub mod math {
    /// One million parts = unity (100%).
    pub const PPM: u128 = 1_000_000;

    /// `a * b / denom`, `None` on overflow or a zero denominator.
    pub fn mul_div(a: u128, b: u128, denom: u128) -> Option<u128> {
        a.checked_mul(b)?.checked_div(denom)
    }

    /// Scale `value` down by a PPM fraction: `value * fraction_ppm / PPM`.
    pub fn scale_down(value: u128, fraction_ppm: u128) -> Option<u128> {
        mul_div(value, fraction_ppm, PPM)
    }

    /// Express `part` as a PPM fraction of `whole`: `part * PPM / whole`.
    pub fn to_fraction(part: u128, whole: u128) -> Option<u128> {
        mul_div(part, PPM, whole)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn scale_down_truncates() {
            // 333 * 1.015 = 337.995 → 337
            assert_eq!(scale_down(333, 1_015_000), Some(337));
        }

        #[test]
        fn scale_down_at_unity_is_identity() {
            assert_eq!(scale_down(123_456, PPM), Some(123_456));
        }

        #[test]
        fn to_fraction_of_half() {
            assert_eq!(to_fraction(550, 1_100), Some(500_000));
        }

        #[test]
        fn zero_denominator_is_none() {
            assert_eq!(mul_div(1, 1, 0), None);
            assert_eq!(to_fraction(1, 0), None);
        }

        #[test]
        fn overflow_is_none() {
            assert_eq!(mul_div(u128::MAX, 2, 1), None);
        }
    }
}

/// # Railbird — Tournament Staking Ledger
///
/// **Role:** Book of record for fractional ownership of professional
/// players' tournament results. Backers fund a player's buy-in in exchange
/// for a PPM-denominated share of the posted net profit, at a markup the
/// player sets when opening the request.
///
/// **Lifecycle per engagement:**
/// ```text
///   request_buyin ──► invest × N ──► transfer_to_player
///         │                                  │
///         ▼                                  ▼
///   RequestTourney event            player enters event
///                                            │
///   post_result (publisher) ◄────────────────┘
///         │
///         ├──► reconcile (player remits backers' cut, state → idle)
///         └──► claim × N (each backer pulls result × stake / PPM)
/// ```
///
/// Execution is one message at a time; every message either applies fully or
/// reverts fully, so the only races are protocol-level (two backers filling
/// the last unit of a request) and those resolve by submission order.
#[ink::contract]
mod railbird {
    use crate::math;
    use ink::storage::Mapping;

    pub type PlayerId = u64;
    pub type EventId = u64;

    // =========================================================================
    // STORAGE
    // =========================================================================

    /// One registered player. Created once, never deleted.
    #[derive(Debug, Clone, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(
        feature = "std",
        derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
    )]
    pub struct Player {
        /// Sequential id, assigned at registration (first player = 1).
        pub id: PlayerId,
        /// Account that authorizes every player-initiated operation.
        /// Fixed at registration.
        pub controller: AccountId,
        /// Funds accumulated by `invest`, drained by `transfer_to_player`.
        pub bankroll: Balance,
        /// Admin-set ceiling on the face-value buy-in of a request.
        pub max_stake: Balance,
        /// Admin-set eligibility flag; requests require it.
        pub active: bool,
        /// Reserved capability flag. No workflow reads it yet.
        pub shot_clearance: bool,
        /// Event currently being funded/played. 0 = idle.
        pub current_event_id: EventId,
        /// Funding target of the open request. 0 = no open request.
        pub requested_amount: Balance,
        /// Fee multiplier of the open request, in PPM.
        pub markup_ppm: u128,
        /// Face-value buy-in of the open request.
        pub event_buyin: Balance,
        /// Ownership already sold for the current engagement, in PPM.
        pub sold_ppm: u128,
        /// Running total of settlements remitted through `reconcile`.
        pub settled_winnings: Balance,
    }

    #[ink(storage)]
    pub struct Railbird {
        /// Deployer / administrator.
        admin: AccountId,
        /// The only identity allowed to post results.
        results_publisher: AccountId,
        /// Next id handed out by `register_player`.
        next_player_id: PlayerId,
        /// Player records, keyed by id.
        players: Mapping<PlayerId, Player>,
        /// (player, backer, event) → owned fraction of the result, in PPM.
        /// Credited by `invest`, zeroed by `claim`, never removed.
        stakes: Mapping<(PlayerId, AccountId, EventId), u128>,
        /// (event, player) → posted net profit. Overwritten on re-post,
        /// never removed (audit trail).
        results: Mapping<(EventId, PlayerId), Balance>,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// A player opened a buy-in request and is looking for backers.
    #[ink(event)]
    pub struct RequestTourney {
        pub amount_to_sell: Balance,
        #[ink(topic)]
        pub player_id: PlayerId,
        pub event_buyin: Balance,
        #[ink(topic)]
        pub event_id: EventId,
        pub markup_ppm: u128,
    }

    /// The bankroll reached the funding target; the player may now pull it.
    #[ink(event)]
    pub struct PlayerNeedsFunds {
        pub amount_to_sell: Balance,
        #[ink(topic)]
        pub player_id: PlayerId,
    }

    /// The results publisher posted a net profit figure.
    #[ink(event)]
    pub struct UpdateResults {
        pub profit: Balance,
        #[ink(topic)]
        pub event_id: EventId,
        #[ink(topic)]
        pub player_id: PlayerId,
    }

    /// The player remitted the backers' cut; claims are funded.
    #[ink(event)]
    pub struct PickUpProfit {
        pub settlement_value: Balance,
        #[ink(topic)]
        pub event_id: EventId,
        #[ink(topic)]
        pub player_id: PlayerId,
    }

    /// An administrator force-cleared a stuck engagement.
    #[ink(event)]
    pub struct EngagementReset {
        #[ink(topic)]
        pub player_id: PlayerId,
        pub event_id: EventId,
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[derive(Debug, PartialEq, Eq, scale::Encode, scale::Decode)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        /// Caller does not hold the role the operation requires
        /// (administrator, player controller, or results publisher).
        Unauthorized,
        /// Operation attempted outside its required lifecycle state.
        InvalidState,
        /// A value exceeds a configured limit.
        ConstraintViolation,
        /// A caller-supplied value differs from the computed expectation.
        AmountMismatch,
        /// Claim attempted against a zeroed ledger entry.
        EmptyClaim,
        /// No player registered under the given id.
        UnknownPlayer,
        /// Checked arithmetic failed (overflow or division by zero).
        Overflow,
        /// A native value transfer failed.
        TransferFailed,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl Railbird {
        // ---------------------------------------------------------------------
        // Constructor
        // ---------------------------------------------------------------------

        #[ink(constructor)]
        pub fn new(results_publisher: AccountId) -> Self {
            Self {
                admin: Self::env().caller(),
                results_publisher,
                next_player_id: 1,
                players: Mapping::default(),
                stakes: Mapping::default(),
                results: Mapping::default(),
            }
        }

        // =====================================================================
        // PLAYER REGISTRY
        // =====================================================================

        /// Register a new player under `controller`.
        ///
        /// Funding happens exclusively through `invest`, so a nonzero
        /// `initial_bankroll` is rejected. Players start inactive; the
        /// administrator flips `active` via `set_active` once vetted.
        #[ink(message)]
        pub fn register_player(
            &mut self,
            controller: AccountId,
            initial_bankroll: Balance,
            max_stake: Balance,
        ) -> Result<PlayerId, Error> {
            self.only_admin()?;

            if initial_bankroll != 0 {
                return Err(Error::ConstraintViolation);
            }

            let id = self.next_player_id;
            self.next_player_id = id.checked_add(1).ok_or(Error::Overflow)?;

            let player = Player {
                id,
                controller,
                bankroll: 0,
                max_stake,
                active: false,
                shot_clearance: false,
                current_event_id: 0,
                requested_amount: 0,
                markup_ppm: 0,
                event_buyin: 0,
                sold_ppm: 0,
                settled_winnings: 0,
            };
            self.players.insert(id, &player);

            Ok(id)
        }

        /// Overwrite a player's buy-in ceiling. Admin only, unconditional.
        #[ink(message)]
        pub fn set_max_stake(
            &mut self,
            player_id: PlayerId,
            new_max: Balance,
        ) -> Result<(), Error> {
            self.only_admin()?;
            let mut player = self.player(player_id)?;
            player.max_stake = new_max;
            self.players.insert(player_id, &player);
            Ok(())
        }

        /// Toggle a player's eligibility flag. Admin only.
        #[ink(message)]
        pub fn set_active(
            &mut self,
            player_id: PlayerId,
            active: bool,
        ) -> Result<(), Error> {
            self.only_admin()?;
            let mut player = self.player(player_id)?;
            player.active = active;
            self.players.insert(player_id, &player);
            Ok(())
        }

        // =====================================================================
        // ENGAGEMENT WORKFLOW — Request
        // =====================================================================

        /// Open a buy-in request for `event_id`, selling `amount_to_sell`
        /// worth of the result at `markup_ppm`.
        ///
        /// The funding target is the *sale amount scaled by the markup*, not
        /// the face-value buy-in:
        ///
        /// ```text
        ///   requested_amount = amount_to_sell * markup_ppm / PPM
        /// ```
        ///
        /// Backers therefore pay the markup up front; the fraction of the
        /// result on offer is derived from the fee-adjusted buy-in at
        /// `invest` time.
        #[ink(message)]
        pub fn request_buyin(
            &mut self,
            player_id: PlayerId,
            amount_to_sell: Balance,
            event_buyin: Balance,
            event_id: EventId,
            markup_ppm: u128,
        ) -> Result<(), Error> {
            let mut player = self.player(player_id)?;
            self.only_controller(&player)?;

            if !player.active {
                return Err(Error::InvalidState);
            }
            // One engagement at a time.
            if player.requested_amount != 0 {
                return Err(Error::InvalidState);
            }
            if event_buyin > player.max_stake {
                return Err(Error::ConstraintViolation);
            }
            // 0 is the idle sentinel and can never name a real event.
            if event_id == 0 {
                return Err(Error::ConstraintViolation);
            }

            let requested =
                math::scale_down(amount_to_sell, markup_ppm).ok_or(Error::Overflow)?;

            player.requested_amount = requested;
            player.markup_ppm = markup_ppm;
            player.event_buyin = event_buyin;
            player.current_event_id = event_id;
            self.players.insert(player_id, &player);

            self.env().emit_event(RequestTourney {
                amount_to_sell,
                player_id,
                event_buyin,
                event_id,
                markup_ppm,
            });

            Ok(())
        }

        // =====================================================================
        // ENGAGEMENT WORKFLOW — Invest
        // =====================================================================

        /// Fund part of an open request, attaching the payment as native
        /// value. Any account may back any open request, repeatedly.
        ///
        /// The gap check bounds `amount_to_sell` by the unfunded remainder;
        /// the attached value itself is accepted in full, so a payment that
        /// truncates oddly is the caller's problem. Compute exact amounts
        /// off-chain.
        ///
        /// Ownership awarded, in PPM of the player's result:
        /// ```text
        ///   total_sellable_ppm = requested_amount * PPM
        ///                        / (event_buyin * markup_ppm / PPM)
        ///   awarded_ppm = total_sellable_ppm * funding_value / requested_amount
        /// ```
        #[ink(message, payable)]
        pub fn invest(
            &mut self,
            player_id: PlayerId,
            amount_to_sell: Balance,
        ) -> Result<(), Error> {
            let mut player = self.player(player_id)?;

            if player.requested_amount == 0 {
                return Err(Error::InvalidState);
            }

            let funding_value = self.env().transferred_value();

            let gap = player.requested_amount.saturating_sub(player.bankroll);
            if amount_to_sell > gap {
                return Err(Error::ConstraintViolation);
            }

            player.bankroll = player
                .bankroll
                .checked_add(funding_value)
                .ok_or(Error::Overflow)?;

            let fee_adjusted_buyin =
                math::scale_down(player.event_buyin, player.markup_ppm)
                    .ok_or(Error::Overflow)?;
            let total_sellable_ppm =
                math::to_fraction(player.requested_amount, fee_adjusted_buyin)
                    .ok_or(Error::Overflow)?;
            let awarded_ppm =
                math::mul_div(total_sellable_ppm, funding_value, player.requested_amount)
                    .ok_or(Error::Overflow)?;

            let backer = self.env().caller();
            let key = (player_id, backer, player.current_event_id);
            let held = self.stakes.get(key).unwrap_or(0);
            let updated = held.checked_add(awarded_ppm).ok_or(Error::Overflow)?;
            self.stakes.insert(key, &updated);

            player.sold_ppm = player
                .sold_ppm
                .checked_add(awarded_ppm)
                .ok_or(Error::Overflow)?;

            let funded = player.bankroll >= player.requested_amount;
            self.players.insert(player_id, &player);

            if funded {
                self.env().emit_event(PlayerNeedsFunds {
                    amount_to_sell,
                    player_id,
                });
            }

            Ok(())
        }

        // =====================================================================
        // ENGAGEMENT WORKFLOW — Transfer to player
        // =====================================================================

        /// Pull the fully-funded bankroll to the player's controller account.
        ///
        /// `expected_amount` must equal the funding target exactly, and the
        /// bankroll must have reached it. Retrying after the bankroll is
        /// drained fails the funding precondition rather than double-paying.
        #[ink(message)]
        pub fn transfer_to_player(
            &mut self,
            player_id: PlayerId,
            expected_amount: Balance,
        ) -> Result<(), Error> {
            let mut player = self.player(player_id)?;
            self.only_controller(&player)?;

            if expected_amount != player.requested_amount {
                return Err(Error::AmountMismatch);
            }
            if player.bankroll < player.requested_amount {
                return Err(Error::InvalidState);
            }

            player.bankroll = player
                .bankroll
                .checked_sub(expected_amount)
                .ok_or(Error::Overflow)?;
            self.players.insert(player_id, &player);

            self.env()
                .transfer(player.controller, expected_amount)
                .map_err(|_| Error::TransferFailed)?;

            Ok(())
        }

        // =====================================================================
        // ENGAGEMENT WORKFLOW — Reconcile
        // =====================================================================

        /// Remit the backers' total cut of a posted result and return the
        /// player to idle.
        ///
        /// The attached value must equal
        /// `results[(event_id, player_id)] * sold_ppm / PPM` exactly, the
        /// combined amount owed to all backers. On success the five
        /// engagement fields reset and the player may open a new request.
        ///
        /// There is no forced-settlement path: a player who never reconciles
        /// stays engaged until an administrator force-resets them.
        #[ink(message, payable)]
        pub fn reconcile(
            &mut self,
            player_id: PlayerId,
            event_id: EventId,
        ) -> Result<(), Error> {
            let mut player = self.player(player_id)?;
            self.only_controller(&player)?;

            let settlement_value = self.env().transferred_value();
            let profit = self.results.get((event_id, player_id)).unwrap_or(0);
            let owed = math::scale_down(profit, player.sold_ppm).ok_or(Error::Overflow)?;

            if settlement_value != owed {
                return Err(Error::AmountMismatch);
            }

            player.settled_winnings = player
                .settled_winnings
                .checked_add(settlement_value)
                .ok_or(Error::Overflow)?;
            player.current_event_id = 0;
            player.requested_amount = 0;
            player.sold_ppm = 0;
            player.markup_ppm = 0;
            player.event_buyin = 0;
            self.players.insert(player_id, &player);

            self.env().emit_event(PickUpProfit {
                settlement_value,
                event_id,
                player_id,
            });

            Ok(())
        }

        /// Force-clear a stuck engagement. Admin only.
        ///
        /// Resets the engagement fields without settlement; ledger entries
        /// for the abandoned event are forfeited (they remain on the books
        /// but no result-backed remittance will arrive for them).
        #[ink(message)]
        pub fn force_reset_engagement(&mut self, player_id: PlayerId) -> Result<(), Error> {
            self.only_admin()?;
            let mut player = self.player(player_id)?;

            if player.current_event_id == 0 && player.requested_amount == 0 {
                return Err(Error::InvalidState);
            }

            let event_id = player.current_event_id;
            player.current_event_id = 0;
            player.requested_amount = 0;
            player.sold_ppm = 0;
            player.markup_ppm = 0;
            player.event_buyin = 0;
            self.players.insert(player_id, &player);

            self.env().emit_event(EngagementReset { player_id, event_id });

            Ok(())
        }

        // =====================================================================
        // RESULTS STORE
        // =====================================================================

        /// Post the net profit for (event, player). Publisher only.
        /// Re-posting overwrites; prior figures keep no history.
        #[ink(message)]
        pub fn post_result(
            &mut self,
            event_id: EventId,
            player_id: PlayerId,
            profit: Balance,
        ) -> Result<(), Error> {
            if self.env().caller() != self.results_publisher {
                return Err(Error::Unauthorized);
            }

            self.results.insert((event_id, player_id), &profit);

            self.env().emit_event(UpdateResults {
                profit,
                event_id,
                player_id,
            });

            Ok(())
        }

        /// Total currently owed to all backers combined for (player, event):
        /// `result * sold_ppm / PPM`. Reads the live `sold_ppm`, so after a
        /// reconcile this returns 0.
        #[ink(message)]
        pub fn get_owed(&self, player_id: PlayerId, event_id: EventId) -> Balance {
            let Some(player) = self.players.get(player_id) else {
                return 0;
            };
            let profit = self.results.get((event_id, player_id)).unwrap_or(0);
            math::scale_down(profit, player.sold_ppm).unwrap_or(0)
        }

        // =====================================================================
        // PAYOUT PROTOCOL
        // =====================================================================

        /// Pull the caller's share of a posted result:
        /// `payout = result * stake_ppm / PPM`.
        ///
        /// Pull-based and independent of `reconcile`; the ledger entry is
        /// zeroed only after the payout transfer succeeds, and a second
        /// claim against the zeroed entry fails with `EmptyClaim`.
        #[ink(message)]
        pub fn claim(&mut self, player_id: PlayerId, event_id: EventId) -> Result<Balance, Error> {
            let backer = self.env().caller();
            let key = (player_id, backer, event_id);

            let stake_ppm = self.stakes.get(key).unwrap_or(0);
            if stake_ppm == 0 {
                return Err(Error::EmptyClaim);
            }

            let profit = self.results.get((event_id, player_id)).unwrap_or(0);
            let payout = math::scale_down(profit, stake_ppm).ok_or(Error::Overflow)?;

            self.env()
                .transfer(backer, payout)
                .map_err(|_| Error::TransferFailed)?;

            self.stakes.insert(key, &0);

            Ok(payout)
        }

        // =====================================================================
        // ADMIN
        // =====================================================================

        /// Rotate the results-publisher identity. Admin only.
        #[ink(message)]
        pub fn set_results_publisher(&mut self, account: AccountId) -> Result<(), Error> {
            self.only_admin()?;
            self.results_publisher = account;
            Ok(())
        }

        // =====================================================================
        // VIEWS
        // =====================================================================

        #[ink(message)]
        pub fn get_player(&self, player_id: PlayerId) -> Option<Player> {
            self.players.get(player_id)
        }

        /// A backer's ledger entry for (player, event), in PPM. 0 means
        /// never credited or already claimed.
        #[ink(message)]
        pub fn stake_of(
            &self,
            player_id: PlayerId,
            backer: AccountId,
            event_id: EventId,
        ) -> u128 {
            self.stakes.get((player_id, backer, event_id)).unwrap_or(0)
        }

        /// Posted net profit for (event, player), 0 if none posted.
        #[ink(message)]
        pub fn result_of(&self, event_id: EventId, player_id: PlayerId) -> Balance {
            self.results.get((event_id, player_id)).unwrap_or(0)
        }

        /// Number of players registered so far.
        #[ink(message)]
        pub fn player_count(&self) -> u64 {
            self.next_player_id.saturating_sub(1)
        }

        #[ink(message)]
        pub fn admin(&self) -> AccountId {
            self.admin
        }

        #[ink(message)]
        pub fn results_publisher(&self) -> AccountId {
            self.results_publisher
        }

        // ---------------------------------------------------------------------
        // Internal guards
        // ---------------------------------------------------------------------

        fn player(&self, player_id: PlayerId) -> Result<Player, Error> {
            self.players.get(player_id).ok_or(Error::UnknownPlayer)
        }

        fn only_admin(&self) -> Result<(), Error> {
            if self.env().caller() != self.admin {
                return Err(Error::Unauthorized);
            }
            Ok(())
        }

        fn only_controller(&self, player: &Player) -> Result<(), Error> {
            if self.env().caller() != player.controller {
                return Err(Error::Unauthorized);
            }
            Ok(())
        }
    }

    // =========================================================================
    // TESTS
    // =========================================================================

}
