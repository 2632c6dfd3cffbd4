//! A module for defining a [`Scenario`] of virtual users that exercise the math service.

use std::time::Duration;

use anyhow::Result;
use mathservice_types::AddRequest;
use rand::SeedableRng;
use rand::distr::{Distribution, Uniform};
use rand::rngs::SmallRng;

/// Default lower bound of the think time between two requests of a virtual user.
pub const DEFAULT_MIN_THINK_TIME: Duration = Duration::from_secs(1);
/// Default upper bound of the think time between two requests of a virtual user.
pub const DEFAULT_MAX_THINK_TIME: Duration = Duration::from_secs(2);

/// A builder for creating a [`Scenario`].
#[derive(Debug)]
pub struct ScenarioBuilder {
    name: String,
    users: usize,
    seed: u64,

    min_think_time: Duration,
    max_think_time: Duration,
    spawn_interval: Duration,

    payload: AddRequest,
    validate_response: bool,
}

impl ScenarioBuilder {
    /// The number of independent virtual users.
    pub fn users(mut self, users: usize) -> Self {
        self.users = users;
        self
    }

    /// Bounds of the pause between two requests of a user.
    ///
    /// Every pause is drawn uniformly from the closed interval `[min, max]`.
    pub fn think_time(mut self, min: Duration, max: Duration) -> Self {
        self.min_think_time = min;
        self.max_think_time = max;
        self
    }

    /// Delay between starting two consecutive users.
    pub fn spawn_interval(mut self, interval: Duration) -> Self {
        self.spawn_interval = interval;
        self
    }

    /// The request every user sends in each iteration.
    pub fn payload(mut self, payload: AddRequest) -> Self {
        self.payload = payload;
        self
    }

    /// Whether successful responses must carry the correct sum.
    pub fn validate_response(mut self, validate: bool) -> Self {
        self.validate_response = validate;
        self
    }

    /// Seed for the think time RNGs, for reproducible pacing.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Creates the scenario instance.
    ///
    /// Fails if the scenario has no users or the think time bounds are inverted.
    pub fn build(self) -> Result<Scenario> {
        anyhow::ensure!(self.users > 0, "a scenario needs at least one user");

        let think_time = Uniform::new_inclusive(self.min_think_time, self.max_think_time)
            .map_err(|err| {
                anyhow::anyhow!(
                    "invalid think time {:?}..={:?}: {err}",
                    self.min_think_time,
                    self.max_think_time
                )
            })?;

        Ok(Scenario {
            name: self.name,
            users: self.users,
            seed: self.seed,
            think_time,
            spawn_interval: self.spawn_interval,
            payload: self.payload,
            validate_response: self.validate_response,
        })
    }
}

/// Specification of a load test that can be run against a math service.
#[derive(Debug)]
pub struct Scenario {
    /// Name of the scenario for identification in logs and the report.
    pub(crate) name: String,
    /// The number of independent virtual users.
    pub(crate) users: usize,
    /// Base seed from which every user derives its own RNG.
    seed: u64,
    /// The distribution of pauses between requests.
    think_time: Uniform<Duration>,
    /// Delay between starting two consecutive users.
    pub(crate) spawn_interval: Duration,
    /// The request sent in every iteration.
    pub(crate) payload: AddRequest,
    /// Whether successful responses must carry the correct sum.
    pub(crate) validate_response: bool,
}

impl Scenario {
    /// Constructs a new scenario builder with the given name.
    ///
    /// By default, a single user sends `10 + 5` with a think time between one and two seconds.
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder {
            name: name.into(),
            users: 1,
            seed: rand::random(),

            min_think_time: DEFAULT_MIN_THINK_TIME,
            max_think_time: DEFAULT_MAX_THINK_TIME,
            spawn_interval: Duration::ZERO,

            payload: AddRequest::new(10.0, 5.0),
            validate_response: false,
        }
    }

    /// Creates the state of the virtual user with the given index.
    ///
    /// Every user gets its own RNG, so pauses are independent across users.
    pub(crate) fn user(&self, id: usize) -> VirtualUser {
        VirtualUser {
            id,
            rng: SmallRng::seed_from_u64(self.seed.wrapping_add(id as u64)),
            think_time: self.think_time.clone(),
        }
    }
}

/// Per-user state of a running scenario.
#[derive(Debug)]
pub(crate) struct VirtualUser {
    /// Index of the user within its scenario.
    pub id: usize,
    rng: SmallRng,
    think_time: Uniform<Duration>,
}

impl VirtualUser {
    /// Draws the pause before the next request.
    pub fn next_think_time(&mut self) -> Duration {
        self.think_time.sample(&mut self.rng)
    }
}
