//! The battle orchestrator.
//!
//! [`Battle`] owns the authoritative roster, capture points, skill
//! state and projectile pool, and advances them through a fixed
//! per-tick pipeline. Commands from the boundary are queued and
//! applied at the next tick boundary; everything else is driven by
//! [`Battle::tick`]. Given the same configuration and command stream,
//! two battles produce identical state on every tick.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::AutoAi;
use crate::capture::CapturePoint;
use crate::catalog::{DeckEntry, UnitKind};
use crate::commands::{issue_swipe, BattleCommand, BattleMode};
use crate::error::{BattleError, Result};
use crate::events::{BattleOutcome, BattleResult, DamageEvent, HudState, ProjectileLaunch, TickEvents};
use crate::factions::Faction;
use crate::map;
use crate::math::Fixed;
use crate::projectiles::ProjectilePool;
use crate::skills::{Skills, SKILL_SLOT_COUNT};
use crate::units::{Unit, UnitId, DEATH_LINGER_TICKS};

/// Ticks per second for the battle simulation.
pub const TICK_RATE: u32 = 20;

/// Duration of each tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Default battle clock in seconds.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 600;

/// Ticks between HUD refreshes.
const HUD_INTERVAL_TICKS: u64 = TICK_RATE as u64;

/// The fixed enemy lineup: two Infantry, one Armor, one Air, one
/// Specialist, all tier 1.
#[must_use]
pub fn enemy_deck() -> [DeckEntry; 5] {
    [
        DeckEntry::new(UnitKind::Infantry, 1),
        DeckEntry::new(UnitKind::Infantry, 1),
        DeckEntry::new(UnitKind::Armor, 1),
        DeckEntry::new(UnitKind::Air, 1),
        DeckEntry::new(UnitKind::Specialist, 1),
    ]
}

/// Lifecycle of a battle. The machine only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Configured but not started; no simulation runs.
    Pending,
    /// The per-tick pipeline is running.
    Active,
    /// Terminal. Entered exactly once; all further ticks short
    /// circuit.
    Ended,
}

/// Everything needed to set up one battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Player deck, slot order.
    pub deck: [DeckEntry; 5],
    /// Battle objective.
    pub mode: BattleMode,
    /// Battle clock in seconds. Must be at least 1.
    pub time_limit_secs: u32,
}

impl BattleConfig {
    /// Check deck tiers and the time limit.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidTier`] for an out-of-range deck
    /// tier and [`BattleError::ZeroTimeLimit`] for a zero clock.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit_secs == 0 {
            return Err(BattleError::ZeroTimeLimit);
        }
        for entry in &self.deck {
            entry.stats()?;
        }
        Ok(())
    }
}

impl Default for BattleConfig {
    /// Attack mode against the mirror of the enemy lineup, default
    /// clock.
    fn default() -> Self {
        Self {
            deck: enemy_deck(),
            mode: BattleMode::Attack,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
        }
    }
}

/// The core battle simulation.
///
/// Owns all battle state and advances it deterministically. Systems
/// run in a fixed order each tick:
///
/// 1. **Clock** - decrement the battle clock
/// 2. **Pruning** - remove corpses past their linger period
/// 3. **AI** - both faction controllers issue orders
/// 4. **Advance** - movement integration, then attack execution
/// 5. **Projectiles** - visual pool stepping
/// 6. **Capture** - capture-point state machine
/// 7. **Skills** - cooldowns and running effects
/// 8. **Outcome** - win/lose evaluation, throttled HUD, time expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    /// Current tick, counted from construction.
    tick: u64,
    /// Tick at which the battle went [`BattlePhase::Active`].
    started_tick: u64,
    phase: BattlePhase,
    config: BattleConfig,
    /// Remaining battle clock in ticks.
    time_left_ticks: u64,
    /// Full roster, player units first, in spawn order.
    units: Vec<Unit>,
    next_unit_id: UnitId,
    /// Unit fielded in each deck slot. Stable across deaths.
    deck_slots: [UnitId; 5],
    points: [CapturePoint; 3],
    pool: ProjectilePool,
    skills: Skills,
    player_ai: AutoAi,
    enemy_ai: AutoAi,
    /// Whether the player controller runs. The enemy controller
    /// always runs.
    auto_enabled: bool,
    /// Commands waiting for the next tick boundary.
    queued: Vec<BattleCommand>,
    result: Option<BattleResult>,
}

impl Battle {
    /// Create a battle in [`BattlePhase::Pending`] with rosters
    /// deployed.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails
    /// [`BattleConfig::validate`].
    pub fn new(config: BattleConfig) -> Result<Self> {
        config.validate()?;
        let mut battle = Self {
            tick: 0,
            started_tick: 0,
            phase: BattlePhase::Pending,
            config,
            time_left_ticks: 0,
            units: Vec::new(),
            next_unit_id: 1,
            deck_slots: [0; 5],
            points: Self::initial_points(config.mode),
            pool: ProjectilePool::new(),
            skills: Skills::new(),
            player_ai: AutoAi::new(Faction::Player),
            enemy_ai: AutoAi::new(Faction::Enemy),
            auto_enabled: true,
            queued: Vec::new(),
            result: None,
        };
        battle.build_battlefield()?;
        Ok(battle)
    }

    /// Current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Full roster, including lingering corpses.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// The three capture points.
    #[must_use]
    pub fn capture_points(&self) -> &[CapturePoint] {
        &self.points
    }

    /// Skill cooldown state.
    #[must_use]
    pub const fn skills(&self) -> &Skills {
        &self.skills
    }

    /// Unit fielded in each deck slot.
    #[must_use]
    pub const fn deck_slots(&self) -> [UnitId; 5] {
        self.deck_slots
    }

    /// Whether the player controller is driving the player roster.
    #[must_use]
    pub const fn auto_enabled(&self) -> bool {
        self.auto_enabled
    }

    /// Final result, present once the battle has ended.
    #[must_use]
    pub const fn result(&self) -> Option<BattleResult> {
        self.result
    }

    /// Whole seconds left on the battle clock.
    #[must_use]
    pub fn time_left_secs(&self) -> u32 {
        u32::try_from(self.time_left_ticks / u64::from(TICK_RATE)).unwrap_or(u32::MAX)
    }

    /// Living units of a faction.
    #[must_use]
    pub fn living_count(&self, faction: Faction) -> u32 {
        let count = self
            .units
            .iter()
            .filter(|unit| unit.alive && unit.faction == faction)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Capture points currently owned by a faction.
    #[must_use]
    pub fn owned_points(&self, faction: Faction) -> u32 {
        let count = self
            .points
            .iter()
            .filter(|point| point.owner == Some(faction))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Queue a command for the next tick boundary.
    ///
    /// Commands queued after the battle has ended are dropped.
    pub fn queue_command(&mut self, command: BattleCommand) {
        if self.phase == BattlePhase::Ended {
            return;
        }
        self.queued.push(command);
    }

    /// Begin the battle with the configuration given at construction.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] unless the battle is
    /// still [`BattlePhase::Pending`].
    pub fn start(&mut self) -> Result<()> {
        let config = self.config;
        self.apply_start(config)
    }

    /// Advance the battle by one tick, returning the events the tick
    /// produced.
    ///
    /// Queued commands are applied first; the simulation pipeline
    /// then runs if the battle is active. Ticking an ended battle
    /// returns empty events and changes nothing.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        if self.phase == BattlePhase::Ended {
            return events;
        }

        self.apply_queued_commands(&mut events);

        if self.phase != BattlePhase::Active {
            self.tick += 1;
            return events;
        }

        // 1. Battle clock
        self.time_left_ticks = self.time_left_ticks.saturating_sub(1);

        // 2. Corpse pruning
        self.prune_dead();

        // 3. Autonomous decisions
        if self.auto_enabled {
            self.player_ai.drive(&mut self.units, &self.points);
        }
        self.enemy_ai.drive(&mut self.units, &self.points);

        // 4. Movement integration and attack execution
        self.advance_units(&mut events);

        // 5. Projectile visuals
        self.pool.step();

        // 6. Capture points
        self.update_capture_points(&mut events);

        // 7. Skill cooldowns and running effects
        self.skills.tick(&mut self.units, &mut events);

        // 8. Win/lose evaluation
        self.evaluate_outcome(&mut events);

        self.tick += 1;

        // 9. Throttled HUD
        let since_start = self.tick - self.started_tick;
        if self.phase == BattlePhase::Active && since_start % HUD_INTERVAL_TICKS == 0 {
            events.hud = Some(self.hud_state());
        }

        // 10. Time expiry
        if self.phase == BattlePhase::Active && self.time_left_ticks == 0 {
            let outcome = self.expiry_outcome();
            self.finish(outcome, since_start, &mut events);
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        events
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two battles fed the same configuration and command stream
    /// produce identical hashes on every tick.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.time_left_ticks.hash(&mut hasher);
        self.phase.hash(&mut hasher);

        self.units.len().hash(&mut hasher);
        for unit in &self.units {
            unit.id.hash(&mut hasher);
            unit.faction.hash(&mut hasher);
            unit.position.x.to_bits().hash(&mut hasher);
            unit.position.y.to_bits().hash(&mut hasher);
            unit.hp.to_bits().hash(&mut hasher);
            unit.speed.to_bits().hash(&mut hasher);
            unit.attack_cooldown.hash(&mut hasher);
            unit.alive.hash(&mut hasher);
        }

        for point in &self.points {
            point.owner.hash(&mut hasher);
            point.contender.hash(&mut hasher);
            point.progress.to_bits().hash(&mut hasher);
        }

        self.skills.cooldowns().hash(&mut hasher);

        self.pool.active_count().hash(&mut hasher);
        for projectile in self.pool.iter_active() {
            projectile.position.x.to_bits().hash(&mut hasher);
            projectile.position.y.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the battle state for snapshots or replay
    /// verification.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::InvalidState(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize battle state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| BattleError::InvalidState(format!("Failed to deserialize battle: {e}")))
    }

    fn apply_queued_commands(&mut self, events: &mut TickEvents) {
        let queued = std::mem::take(&mut self.queued);
        for command in queued {
            match command {
                BattleCommand::Start {
                    deck,
                    mode,
                    time_limit_secs,
                } => {
                    let config = BattleConfig {
                        deck,
                        mode,
                        time_limit_secs,
                    };
                    if let Err(error) = self.apply_start(config) {
                        tracing::warn!(%error, "Rejected battle start");
                    }
                }
                BattleCommand::Skill { slot } => {
                    if self.phase == BattlePhase::Active {
                        self.cast_slot(slot, events);
                    }
                }
                BattleCommand::Swipe { direction } => {
                    // Swipes are honored only under manual control.
                    if self.phase == BattlePhase::Active && !self.auto_enabled {
                        issue_swipe(&mut self.units, Faction::Player, direction);
                    }
                }
                BattleCommand::AutoToggle { auto } => {
                    self.auto_enabled = auto;
                }
            }
        }
    }

    fn apply_start(&mut self, config: BattleConfig) -> Result<()> {
        if self.phase != BattlePhase::Pending {
            return Err(BattleError::InvalidState(
                "battle already started".to_string(),
            ));
        }
        config.validate()?;
        self.config = config;
        self.build_battlefield()?;
        self.phase = BattlePhase::Active;
        self.started_tick = self.tick;
        Ok(())
    }

    /// Deploy both rosters and reset the per-battle systems.
    fn build_battlefield(&mut self) -> Result<()> {
        self.units.clear();

        let deck = self.config.deck;
        for (slot, (entry, spawn)) in deck.iter().zip(map::player_spawns()).enumerate() {
            let id = self.allocate_unit_id();
            self.units.push(Unit::new(id, Faction::Player, *entry, spawn)?);
            self.deck_slots[slot] = id;
        }

        for (entry, spawn) in enemy_deck().into_iter().zip(map::enemy_spawns()) {
            let id = self.allocate_unit_id();
            self.units.push(Unit::new(id, Faction::Enemy, entry, spawn)?);
        }

        self.points = Self::initial_points(self.config.mode);
        self.pool = ProjectilePool::new();
        self.skills = Skills::new();
        self.time_left_ticks = u64::from(self.config.time_limit_secs) * u64::from(TICK_RATE);
        Ok(())
    }

    fn allocate_unit_id(&mut self) -> UnitId {
        let id = self.next_unit_id;
        self.next_unit_id += 1;
        id
    }

    fn initial_points(mode: BattleMode) -> [CapturePoint; 3] {
        let positions = map::capture_point_positions();
        let build = |id: u8, position| match mode {
            BattleMode::Attack => CapturePoint::new(id, position),
            BattleMode::Defense => CapturePoint::owned_by(id, position, Faction::Player),
        };
        [
            build(0, positions[0]),
            build(1, positions[1]),
            build(2, positions[2]),
        ]
    }

    fn prune_dead(&mut self) {
        for unit in &mut self.units {
            if !unit.alive {
                unit.dead_ticks += 1;
            }
        }
        self.units
            .retain(|unit| unit.alive || unit.dead_ticks <= DEATH_LINGER_TICKS);
    }

    /// Integrate movement for every unit, then execute attacks in
    /// roster order against post-movement positions.
    fn advance_units(&mut self, events: &mut TickEvents) {
        for unit in &mut self.units {
            unit.advance_movement();
        }

        for index in 0..self.units.len() {
            self.units[index].tick_cooldown();
            if !self.units[index].alive {
                continue;
            }
            let Some(target_id) = self.units[index].attack_target else {
                continue;
            };

            let Some(target_index) = self
                .units
                .iter()
                .position(|unit| unit.id == target_id && unit.alive)
            else {
                // The target died or was pruned; release it quietly.
                self.units[index].set_attack_target(None);
                continue;
            };

            let target_position = self.units[target_index].position;
            if !self.units[index].in_attack_range(target_position) {
                continue;
            }
            if !self.units[index].can_attack() {
                continue;
            }

            let attacker_id = self.units[index].id;
            let origin = self.units[index].position;
            let damage = Fixed::from_num(self.units[index].attack);
            let ranged = self.units[index].is_ranged();

            let dealt = self.units[target_index].take_damage(damage);
            events
                .damage
                .push(DamageEvent::from_dealt(attacker_id, target_id, dealt));
            if !self.units[target_index].alive {
                events.deaths.push(target_id);
            }

            // On pool exhaustion the visual is skipped; damage above
            // already landed.
            if ranged && self.pool.fire(attacker_id, origin, target_position) {
                events.projectiles.push(ProjectileLaunch {
                    attacker: attacker_id,
                    origin,
                    target: target_position,
                });
            }

            self.units[index].reset_attack_cooldown();
        }
    }

    fn update_capture_points(&mut self, events: &mut TickEvents) {
        for point in &mut self.points {
            let mut player = 0u32;
            let mut enemy = 0u32;
            for unit in self.units.iter().filter(|unit| unit.alive) {
                if point.in_capture_radius(unit.position) {
                    match unit.faction {
                        Faction::Player => player += 1,
                        Faction::Enemy => enemy += 1,
                    }
                }
            }
            if let Some(change) = point.update(player, enemy) {
                events.captures.push(change);
            }
        }
    }

    fn cast_slot(&mut self, slot: u8, events: &mut TickEvents) {
        let index = usize::from(slot);
        if index >= SKILL_SLOT_COUNT {
            return;
        }
        let caster = self.deck_slots[index];
        self.skills.activate(caster, &mut self.units, events);
    }

    /// Check the per-mode win and loss conditions. Win conditions are
    /// evaluated first, so a tick satisfying both resolves as a win.
    fn evaluate_outcome(&mut self, events: &mut TickEvents) {
        let player_alive = self.living_count(Faction::Player);
        let enemy_alive = self.living_count(Faction::Enemy);
        let player_points = self.owned_points(Faction::Player);
        let enemy_points = self.owned_points(Faction::Enemy);

        let outcome = match self.config.mode {
            BattleMode::Attack => {
                if enemy_alive == 0 || player_points >= 2 {
                    Some(BattleOutcome::Victory)
                } else if player_alive == 0 {
                    Some(BattleOutcome::Defeat)
                } else {
                    None
                }
            }
            BattleMode::Defense => {
                if enemy_alive == 0 {
                    Some(BattleOutcome::Victory)
                } else if player_alive == 0 || enemy_points == 3 {
                    Some(BattleOutcome::Defeat)
                } else {
                    None
                }
            }
        };

        if let Some(outcome) = outcome {
            let elapsed_ticks = self.tick - self.started_tick + 1;
            self.finish(outcome, elapsed_ticks, events);
        }
    }

    /// Outcome when the clock runs out with the battle undecided.
    fn expiry_outcome(&self) -> BattleOutcome {
        let player_points = self.owned_points(Faction::Player);
        let enemy_points = self.owned_points(Faction::Enemy);

        let won = match self.config.mode {
            BattleMode::Attack => player_points > enemy_points,
            BattleMode::Defense => player_points >= 1,
        };
        if won {
            BattleOutcome::Victory
        } else {
            BattleOutcome::Defeat
        }
    }

    /// Enter [`BattlePhase::Ended`] and emit the result exactly once.
    fn finish(&mut self, outcome: BattleOutcome, elapsed_ticks: u64, events: &mut TickEvents) {
        if self.phase == BattlePhase::Ended {
            return;
        }
        self.phase = BattlePhase::Ended;

        let survivors = self.living_count(Faction::Player);
        let elapsed_secs =
            u32::try_from(elapsed_ticks / u64::from(TICK_RATE)).unwrap_or(u32::MAX);
        let result = BattleResult::tally(outcome, self.config.mode, survivors, elapsed_secs);

        tracing::info!(
            outcome = ?result.outcome,
            survivors = result.survivors,
            elapsed_secs = result.elapsed_secs,
            resource_reward = result.resource_reward,
            fame_reward = result.fame_reward,
            "Battle ended"
        );

        self.result = Some(result);
        events.result = Some(result);
    }

    fn hud_state(&self) -> HudState {
        HudState {
            time_left_secs: self.time_left_secs(),
            player_alive: self.living_count(Faction::Player),
            enemy_alive: self.living_count(Faction::Enemy),
            skill_cooldowns: self.skills.ratios(),
        }
    }
}
