use routecheck::{ConsistencyLevel, ConsistencyLevelDispatcher, HarnessError, RoutingPolicy};

#[test]
fn leader_levels_are_local_one_and_quorum() {
    assert_eq!(
        ConsistencyLevelDispatcher::levels_for(RoutingPolicy::LeaderOnly),
        vec![ConsistencyLevel::Quorum, ConsistencyLevel::LocalOne]
    );
}

#[test]
fn only_one_may_be_served_by_any_replica() {
    assert_eq!(
        ConsistencyLevelDispatcher::levels_for(RoutingPolicy::AnyReplica),
        vec![ConsistencyLevel::One]
    );
}

#[test]
fn remaining_levels_are_unsupported() {
    let unsupported = ConsistencyLevelDispatcher::levels_for(RoutingPolicy::Unsupported);
    assert_eq!(unsupported.len(), 8);
    for level in [
        ConsistencyLevel::All,
        ConsistencyLevel::Any,
        ConsistencyLevel::EachQuorum,
        ConsistencyLevel::LocalQuorum,
        ConsistencyLevel::LocalSerial,
        ConsistencyLevel::Serial,
        ConsistencyLevel::Three,
        ConsistencyLevel::Two,
    ] {
        assert!(unsupported.contains(&level), "{} should be unsupported", level);
    }
}

#[test]
fn every_level_has_exactly_one_policy() {
    let total: usize = [
        RoutingPolicy::LeaderOnly,
        RoutingPolicy::AnyReplica,
        RoutingPolicy::Unsupported,
    ]
    .into_iter()
    .map(|policy| ConsistencyLevelDispatcher::levels_for(policy).len())
    .sum();
    assert_eq!(total, ConsistencyLevel::ALL_LEVELS.len());
}

#[test]
fn workload_policy_comes_from_its_levels() {
    let leader_levels = [ConsistencyLevel::LocalOne, ConsistencyLevel::Quorum];
    assert_eq!(
        ConsistencyLevelDispatcher::classify_all(&leader_levels).unwrap(),
        RoutingPolicy::LeaderOnly
    );
    assert_eq!(
        ConsistencyLevelDispatcher::classify_all(&[ConsistencyLevel::One]).unwrap(),
        RoutingPolicy::AnyReplica
    );
}

#[test]
fn mixed_or_empty_workload_has_no_policy() {
    let err = ConsistencyLevelDispatcher::classify_all(&[
        ConsistencyLevel::LocalOne,
        ConsistencyLevel::One,
    ])
    .unwrap_err();
    assert!(matches!(err, HarnessError::ConfigError(ref msg) if msg.contains("ONE")));
    assert!(matches!(
        ConsistencyLevelDispatcher::classify_all(&[]),
        Err(HarnessError::ConfigError(_))
    ));
}

#[test]
fn tokens_parse_case_insensitively() {
    assert_eq!(
        ConsistencyLevelDispatcher::classify_token("local_one").unwrap(),
        RoutingPolicy::LeaderOnly
    );
    assert_eq!(
        ConsistencyLevelDispatcher::classify_token(" ONE ").unwrap(),
        RoutingPolicy::AnyReplica
    );
    assert_eq!(
        ConsistencyLevelDispatcher::classify_token("Each_Quorum").unwrap(),
        RoutingPolicy::Unsupported
    );
}

#[test]
fn unknown_token_is_an_authoring_error() {
    let err = ConsistencyLevelDispatcher::classify_token("FOUR").unwrap_err();
    assert!(matches!(err, HarnessError::UnknownConsistencyLevel(ref token) if token == "FOUR"));
}

#[test]
fn protocol_codes_are_stable() {
    assert_eq!(ConsistencyLevel::Any.code(), 0x0000);
    assert_eq!(ConsistencyLevel::Quorum.code(), 0x0004);
    assert_eq!(ConsistencyLevel::LocalOne.code(), 0x000A);
    for level in ConsistencyLevel::ALL_LEVELS {
        assert_eq!(ConsistencyLevel::from_code(level.code()).unwrap(), level);
    }
    assert!(matches!(
        ConsistencyLevel::from_code(0x000B),
        Err(HarnessError::UnknownConsistencyLevel(_))
    ));
}

#[test]
fn display_uses_wire_names() {
    assert_eq!(ConsistencyLevel::LocalSerial.to_string(), "LOCAL_SERIAL");
    assert_eq!(
        serde_json::to_string(&ConsistencyLevel::LocalOne).unwrap(),
        "\"LOCAL_ONE\""
    );
}
