//! Multi-party simulation over a shared database.
//!
//! A [`World`] signs up one passenger and several drivers, runs their
//! sessions against one in-memory database (optionally behind a chaotic
//! wrapper) and feeds them seeded random inputs. After every step the world
//! settles, records every write to the passenger's trip and checks the
//! registered invariants.

use curbside_app::{
    Bridge, DriverPhase, Registration, Session, SessionAction, SessionConfig, SessionError,
    SessionEvent, sign_out, sign_up,
};
use curbside_backend::{
    ChaoticDatabase, Gateway, GatewayError, MemoryAuth, MemoryDatabase, Subscription, TripUpdate,
};
use curbside_core::{AccountType, Coordinate, TripState, User};
use thiserror::Error;

use crate::{
    SimEnv,
    invariants::{InvariantRegistry, SessionSnapshot, StoredTrip, Violation, WorldSnapshot},
};

/// Database every session in a world talks to.
pub type SimDatabase = ChaoticDatabase<MemoryDatabase>;

/// Center of the simulated service area.
pub const AREA_CENTER: Coordinate = Coordinate::new(37.0, -122.0);

/// Half-width of the service area in degrees (about 2 km).
const AREA_SPAN_DEG: f64 = 0.02;

/// Settle rounds before a world is declared stuck.
const MAX_SETTLE_ROUNDS: usize = 256;

/// Errors from building or stepping a world.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Chaos rate outside `[0.0, 1.0]`
    #[error("chaos rate must be between 0.0 and 1.0, got {0}")]
    InvalidChaosRate(f64),

    /// Sign-up or session start failed
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Reading the stored state failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// One or more invariants failed after a step
    #[error("step {step}: {} invariant violation(s), first: {}", violations.len(), violations[0])]
    Violations {
        /// Step that exposed the violation
        step: u64,
        /// Every violation found
        violations: Vec<Violation>,
    },
}

/// World parameters.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Seed for inputs and chaos.
    pub seed: u64,
    /// Number of drivers.
    pub drivers: usize,
    /// Probability that a database read or write fails.
    pub chaos_rate: f64,
    /// Session tunables.
    pub session: SessionConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self { seed: 0, drivers: 3, chaos_rate: 0.0, session: SessionConfig::default() }
    }
}

/// Counters collected while a world runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Steps taken.
    pub steps: u64,
    /// Trips created.
    pub requested: u64,
    /// Trips claimed by a driver.
    pub claimed: u64,
    /// Trips driven to completion.
    pub completed: u64,
    /// Trips deleted before completion.
    pub cancelled: u64,
    /// Database failures injected.
    pub injected_failures: usize,
}

/// One signed-in user: a session plus the bridge that serves it.
pub struct Participant {
    session: Session,
    bridge: Bridge<SimDatabase>,
}

impl Participant {
    fn start(
        user: User,
        gateway: Gateway<SimDatabase>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let bridge = Bridge::new(gateway, user.uid.clone());
        let mut session = Session::for_user(user, config)?;
        let actions = session.start();

        let mut participant = Self { session, bridge };
        participant.process_actions(actions);
        Ok(participant)
    }

    /// Signed-in uid.
    pub fn uid(&self) -> &str {
        &self.session.user().uid
    }

    /// Session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Bridge state.
    pub fn bridge(&self) -> &Bridge<SimDatabase> {
        &self.bridge
    }

    /// Feed one input event. Subscriptions are left for [`Self::pump`].
    pub fn send(&mut self, event: SessionEvent) {
        let actions = self.session.handle(event);
        self.process_actions(actions);
    }

    /// Deliver pending subscription items. Returns `true` if any arrived.
    pub fn pump(&mut self) -> bool {
        let events = self.bridge.poll_subscriptions();
        let busy = !events.is_empty();
        for event in events {
            let actions = self.session.handle(event);
            self.process_actions(actions);
        }
        busy
    }

    /// Execute actions, feeding bridge results back into the session.
    fn process_actions(&mut self, initial_actions: Vec<SessionAction>) {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            for action in std::mem::take(&mut pending_actions) {
                for event in self.bridge.process_action(action) {
                    pending_actions.extend(self.session.handle(event));
                }
            }
        }
    }
}

/// Every write to one trip record, in order.
struct TripRecorder {
    passenger_uid: String,
    updates: Subscription<TripUpdate>,
    history: Vec<TripState>,
}

/// Deterministic multi-party simulation.
pub struct World {
    env: SimEnv,
    registry: InvariantRegistry,
    auth: MemoryAuth<SimEnv>,
    truth: Gateway<MemoryDatabase>,
    database: SimDatabase,
    passenger: Participant,
    drivers: Vec<Participant>,
    recorder: TripRecorder,
    stats: WorldStats,
}

impl World {
    /// Sign everyone up and start their sessions.
    ///
    /// # Errors
    ///
    /// - `HarnessError::InvalidChaosRate` if the rate is outside `[0.0, 1.0]`
    /// - `HarnessError::Session` if a sign-up or session start fails
    pub fn new(config: WorldConfig) -> Result<Self, HarnessError> {
        if !(0.0..=1.0).contains(&config.chaos_rate) {
            return Err(HarnessError::InvalidChaosRate(config.chaos_rate));
        }

        let env = SimEnv::with_seed(config.seed);
        let auth = MemoryAuth::new(env.clone());
        let store = MemoryDatabase::new();
        let truth = Gateway::new(store.clone());
        let database = ChaoticDatabase::with_seed(store, config.chaos_rate, config.seed);

        // Sign-ups go straight to storage; chaos only applies to sessions
        let rider = sign_up(&auth, &truth, Registration {
            email: "rider@curbside.test".into(),
            password: "passenger".into(),
            fullname: "Rider".into(),
            account_type: AccountType::Passenger,
            location: None,
        })?;

        let mut driver_users = Vec::with_capacity(config.drivers);
        for i in 0..config.drivers {
            driver_users.push(sign_up(&auth, &truth, Registration {
                email: format!("driver{i}@curbside.test"),
                password: "driver-password".into(),
                fullname: format!("Driver {i}"),
                account_type: AccountType::Driver,
                location: Some(random_location(&env)),
            })?);
        }

        let gateway = Gateway::new(database.clone());
        let recorder = TripRecorder {
            passenger_uid: rider.uid.clone(),
            updates: truth.observe_trip(&rider.uid)?,
            history: Vec::new(),
        };

        let mut drivers = Vec::with_capacity(driver_users.len());
        for user in driver_users {
            drivers.push(Participant::start(user, gateway.clone(), config.session)?);
        }
        let passenger = Participant::start(rider, gateway, config.session)?;

        tracing::info!(
            seed = config.seed,
            drivers = config.drivers,
            chaos = config.chaos_rate,
            "world created"
        );

        let mut world = Self {
            env,
            registry: InvariantRegistry::standard(),
            auth,
            truth,
            database,
            passenger,
            drivers,
            recorder,
            stats: WorldStats::default(),
        };
        world.settle();
        world.record();
        Ok(world)
    }

    /// Replace the invariants checked after every step.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Apply one random input, settle, and check invariants.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Violations` if an invariant fails
    /// - `HarnessError::Gateway` if stored state cannot be read
    pub fn step(&mut self) -> Result<(), HarnessError> {
        self.stats.steps += 1;

        let actor = self.env.gen_range(0..self.drivers.len() as u64 + 1) as usize;
        let event = match actor.checked_sub(1) {
            None => self.passenger_input(),
            Some(index) => self.driver_input(&self.drivers[index]),
        };

        let participant = match actor.checked_sub(1) {
            None => &mut self.passenger,
            Some(index) => &mut self.drivers[index],
        };
        tracing::debug!(step = self.stats.steps, uid = participant.uid(), ?event, "input");
        participant.send(event);

        self.apply_and_check()
    }

    /// Deliver `event` to the passenger, settle, and check invariants.
    ///
    /// # Errors
    ///
    /// As for [`Self::step`].
    pub fn send_to_passenger(&mut self, event: SessionEvent) -> Result<(), HarnessError> {
        self.stats.steps += 1;
        self.passenger.send(event);
        self.apply_and_check()
    }

    /// Deliver `event` to driver `index`, settle, and check invariants.
    ///
    /// # Errors
    ///
    /// As for [`Self::step`].
    pub fn send_to_driver(&mut self, index: usize, event: SessionEvent) -> Result<(), HarnessError> {
        self.stats.steps += 1;
        if let Some(driver) = self.drivers.get_mut(index) {
            driver.send(event);
        }
        self.apply_and_check()
    }

    /// Take `steps` random steps.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step.
    pub fn run(&mut self, steps: u64) -> Result<WorldStats, HarnessError> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(self.stats())
    }

    /// Sign everyone out and release their subscriptions.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Session` if a sign-out fails
    pub fn shutdown(mut self) -> Result<WorldStats, HarnessError> {
        for participant in std::iter::once(&mut self.passenger).chain(&mut self.drivers) {
            participant.bridge.release();
            sign_out(&self.auth, &self.truth, participant.session.user())?;
        }
        tracing::info!(stats = ?self.stats(), "world shut down");
        Ok(self.stats())
    }

    /// Stored state and session beliefs right now.
    ///
    /// # Errors
    ///
    /// - `HarnessError::Gateway` if the trip record cannot be read
    pub fn snapshot(&self) -> Result<WorldSnapshot, HarnessError> {
        let mut snapshot = WorldSnapshot::empty();
        if let Some(trip) = self.truth.fetch_trip(&self.recorder.passenger_uid)? {
            snapshot = snapshot.with_trip(StoredTrip::new(&trip, self.recorder.history.clone()));
        }
        for participant in self.participants() {
            snapshot = snapshot.with_session(SessionSnapshot::capture(&participant.session));
        }
        Ok(snapshot)
    }

    /// Counters so far.
    pub fn stats(&self) -> WorldStats {
        WorldStats { injected_failures: self.database.injected_failures(), ..self.stats.clone() }
    }

    /// The passenger.
    pub fn passenger(&self) -> &Participant {
        &self.passenger
    }

    /// The drivers, in sign-up order.
    pub fn drivers(&self) -> &[Participant] {
        &self.drivers
    }

    /// Gateway over the underlying store, bypassing chaos.
    pub fn truth(&self) -> &Gateway<MemoryDatabase> {
        &self.truth
    }

    /// Seeded environment driving the world.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    fn participants(&self) -> impl Iterator<Item = &Participant> {
        std::iter::once(&self.passenger).chain(&self.drivers)
    }

    fn apply_and_check(&mut self) -> Result<(), HarnessError> {
        self.settle();
        self.record();

        let snapshot = self.snapshot()?;
        self.registry
            .check_all(&snapshot)
            .map_err(|violations| HarnessError::Violations { step: self.stats.steps, violations })
    }

    /// Pump every participant until no subscription has items left.
    fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut busy = self.passenger.pump();
            for driver in &mut self.drivers {
                busy |= driver.pump();
            }
            if !busy {
                return;
            }
        }
        tracing::warn!(step = self.stats.steps, "world did not settle");
    }

    fn record(&mut self) {
        let recorder = &mut self.recorder;
        for update in recorder.updates.drain() {
            match update {
                TripUpdate::Changed(trip) => {
                    // A finished record is replaced by the next request
                    if recorder.history.last() == Some(&TripState::Completed)
                        && trip.state == TripState::Requested
                    {
                        recorder.history.clear();
                    }
                    recorder.history.push(trip.state);
                    match trip.state {
                        TripState::Requested => self.stats.requested += 1,
                        TripState::Accepted => self.stats.claimed += 1,
                        TripState::Completed => self.stats.completed += 1,
                        _ => {},
                    }
                },
                TripUpdate::Removed => {
                    if recorder.history.last().is_some_and(|s| *s < TripState::Completed) {
                        self.stats.cancelled += 1;
                    }
                    recorder.history.clear();
                },
            }
        }
    }

    fn passenger_input(&self) -> SessionEvent {
        match self.env.gen_range(0..20) {
            0..=3 => SessionEvent::LocationUpdated(random_location(&self.env)),
            4..=8 => SessionEvent::DestinationSelected { destination: random_location(&self.env) },
            9..=17 => SessionEvent::ConfirmRide,
            18 => SessionEvent::DismissDestination,
            _ => SessionEvent::CancelTrip,
        }
    }

    fn driver_input(&self, driver: &Participant) -> SessionEvent {
        match self.env.gen_range(0..10) {
            0..=3 => SessionEvent::LocationUpdated(self.driver_move(&driver.session)),
            4..=5 => SessionEvent::AcceptTrip,
            6 => SessionEvent::DeclineTrip,
            7..=8 => SessionEvent::StartTrip,
            _ => SessionEvent::DropOff,
        }
    }

    /// Mostly head for the next waypoint of a claimed trip.
    fn driver_move(&self, session: &Session) -> Coordinate {
        if let Session::Driver(driver) = session
            && let DriverPhase::OnTrip(trip) = driver.phase()
            && self.env.gen_unit() < 0.7
        {
            match trip.state {
                TripState::Accepted => return trip.pickup,
                TripState::InProgress => return trip.destination,
                _ => {},
            }
        }
        random_location(&self.env)
    }
}

fn random_location(env: &SimEnv) -> Coordinate {
    let offset = |env: &SimEnv| (env.gen_unit() * 2.0 - 1.0) * AREA_SPAN_DEG;
    Coordinate::new(AREA_CENTER.latitude + offset(env), AREA_CENTER.longitude + offset(env))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_chaos_rate() {
        let config = WorldConfig { chaos_rate: 1.5, ..WorldConfig::default() };
        assert!(matches!(World::new(config), Err(HarnessError::InvalidChaosRate(_))));
    }

    #[test]
    fn world_starts_consistent() {
        let world = World::new(WorldConfig::default()).expect("world");
        assert_eq!(world.drivers().len(), 3);
        assert!(world.snapshot().expect("snapshot").trips.is_empty());
    }

    #[test]
    fn drivers_are_visible_in_the_index() {
        use curbside_backend::Database;

        let world = World::new(WorldConfig::default()).expect("world");
        for driver in world.drivers() {
            let location = world.truth().database().location(driver.uid()).expect("location");
            assert!(location.is_some());
        }
    }

    #[test]
    fn random_locations_stay_in_area() {
        let env = SimEnv::with_seed(3);
        for _ in 0..50 {
            let location = random_location(&env);
            assert!(location.distance_to(&AREA_CENTER) < 4_000.0);
        }
    }
}
