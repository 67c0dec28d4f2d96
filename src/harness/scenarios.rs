use super::TestContext;
use crate::cluster::Statement;
use crate::convergence::{PollOutcome, RowCountPredicate};
use crate::core::Result;
use crate::routing::{
    ConsistencyLevel, ConsistencyLevelDispatcher, RoutingPolicy, VerificationResult,
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

/// What a passing case observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub verifications: Vec<VerificationResult>,
    pub convergence: Vec<PollOutcome>,
    pub rejected_levels: Vec<ConsistencyLevel>,
}

const LEADER_READ_LEVELS: [ConsistencyLevel; 2] =
    [ConsistencyLevel::LocalOne, ConsistencyLevel::Quorum];

pub type CaseFn = for<'a> fn(&'a mut TestContext) -> BoxFuture<'a, Result<ScenarioOutcome>>;

/// One named test body. Setup and teardown are owned by the runner.
#[derive(Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub run: CaseFn,
}

impl TestCase {
    pub const fn new(name: &'static str, run: CaseFn) -> Self {
        Self { name, run }
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// The ordered consistency-level suite.
pub fn default_suite() -> Vec<TestCase> {
    vec![
        TestCase::new("read_from_leader", read_from_leader),
        TestCase::new("read_from_followers", read_from_followers),
        TestCase::new("invalid_consistency_levels", invalid_consistency_levels),
    ]
}

/// Alternates LOCAL_ONE and QUORUM reads; all of them must land on the leader.
pub fn read_from_leader(ctx: &mut TestContext) -> BoxFuture<'_, Result<ScenarioOutcome>> {
    Box::pin(async move {
        let policy = ConsistencyLevelDispatcher::classify_all(&LEADER_READ_LEVELS)?;
        let tablet = ctx.rediscover().await?.clone();
        let baseline = ctx.collect_counters(&tablet).await?;

        for i in 0..ctx.config.num_ops {
            let level = LEADER_READ_LEVELS[i as usize % LEADER_READ_LEVELS.len()];
            ctx.read_all_rows(level).await?;
        }

        let observed = ctx
            .collect_counters(&tablet)
            .await?
            .delta_since(&baseline)?;
        let result = ctx
            .verifier
            .verify(policy, ctx.config.num_ops, &observed)?;

        Ok(ScenarioOutcome {
            verifications: vec![result],
            ..ScenarioOutcome::default()
        })
    })
}

/// Waits for followers to catch up, then checks ONE reads are spread over every replica.
pub fn read_from_followers(ctx: &mut TestContext) -> BoxFuture<'_, Result<ScenarioOutcome>> {
    Box::pin(async move {
        let policy = ConsistencyLevelDispatcher::classify_all(&[ConsistencyLevel::One])?;
        let tablet = ctx.rediscover().await?.clone();

        // Several rounds so that every replica has answered a full read at least once.
        let mut convergence = Vec::with_capacity(ctx.config.convergence_rounds as usize);
        let mut predicate = RowCountPredicate::new(
            ctx.executor.clone(),
            &ctx.config.table_name,
            ConsistencyLevel::One,
            ctx.config.num_rows,
        );
        for _ in 0..ctx.config.convergence_rounds {
            let outcome = ctx
                .waiter
                .wait_until(&mut predicate, ctx.config.convergence_timeout_duration())
                .await?;
            convergence.push(outcome);
        }

        let baseline = ctx.collect_counters(&tablet).await?;
        for _ in 0..ctx.config.num_ops {
            ctx.read_all_rows(ConsistencyLevel::One).await?;
        }

        let observed = ctx
            .collect_counters(&tablet)
            .await?
            .delta_since(&baseline)?;
        for (replica, ops) in observed.iter() {
            event!(Level::INFO, replica = %replica, ops, "num ops for tablet server");
        }
        let result = ctx
            .verifier
            .verify(policy, ctx.config.num_ops, &observed)?;

        Ok(ScenarioOutcome {
            verifications: vec![result],
            convergence,
            ..ScenarioOutcome::default()
        })
    })
}

/// Every unsupported level must be refused by the protocol before any replica serves it.
pub fn invalid_consistency_levels(
    ctx: &mut TestContext,
) -> BoxFuture<'_, Result<ScenarioOutcome>> {
    Box::pin(async move {
        let statement = Statement::select_all(&ctx.config.table_name);
        let mut rejected = Vec::new();
        for level in ConsistencyLevelDispatcher::levels_for(RoutingPolicy::Unsupported) {
            let attempt = ctx.executor.execute(&statement, level).await;
            ctx.verifier.verify_rejection(level, attempt)?;
            rejected.push(level);
        }

        Ok(ScenarioOutcome {
            rejected_levels: rejected,
            ..ScenarioOutcome::default()
        })
    })
}
