use routecheck::cluster::{
    ControlPlane, CreateTableOptions, QueryExecutor, ReadRoutingFault, SimulatedCluster,
    SimulatedClusterConfig, Statement, TableType, stable_tablet_for,
};
use routecheck::harness::test_table_schema;
use routecheck::{ClusterTopologyModel, ConsistencyLevel, HarnessError, HostPort};
use std::sync::Arc;
use std::time::Duration;

async fn start(config: SimulatedClusterConfig) -> SimulatedCluster {
    let cluster = SimulatedCluster::start(config).await.unwrap();
    cluster
        .create_table("t", &test_table_schema(), &CreateTableOptions::default())
        .await
        .unwrap();
    cluster
}

async fn insert_rows(cluster: &SimulatedCluster, rows: i64) {
    let columns = test_table_schema().column_names();
    for idx in 0..rows {
        cluster
            .execute(
                &Statement::insert("t", columns.clone(), vec![idx, idx, idx]),
                ConsistencyLevel::Quorum,
            )
            .await
            .unwrap();
    }
}

async fn select(cluster: &SimulatedCluster, level: ConsistencyLevel) -> usize {
    cluster
        .execute(&Statement::select_all("t"), level)
        .await
        .unwrap()
        .row_count
}

#[test]
fn tablet_assignment_is_stable() {
    assert_eq!(stable_tablet_for(42, 8), stable_tablet_for(42, 8));
    assert!(stable_tablet_for(-7, 3) < 3);
    assert_eq!(stable_tablet_for(1, 0), 0);
}

#[test]
fn config_validation() {
    assert!(SimulatedClusterConfig::new(0).validate().is_err());
    assert!(
        SimulatedClusterConfig::new(3)
            .replication_factor(4)
            .validate()
            .is_err()
    );
    assert!(SimulatedClusterConfig::new(5).replication_factor(3).validate().is_ok());
}

#[tokio::test]
async fn leader_sees_writes_before_followers() {
    let cluster = start(
        SimulatedClusterConfig::new(3).replication_lag(Duration::from_millis(400)),
    )
    .await;
    insert_rows(&cluster, 10).await;

    assert_eq!(select(&cluster, ConsistencyLevel::Quorum).await, 10);
    // ONE reads rotate over replicas; the two followers have not caught up yet.
    let one_reads = [
        select(&cluster, ConsistencyLevel::One).await,
        select(&cluster, ConsistencyLevel::One).await,
        select(&cluster, ConsistencyLevel::One).await,
    ];
    assert_eq!(one_reads.iter().filter(|rows| **rows == 10).count(), 1);
    assert_eq!(one_reads.iter().filter(|rows| **rows == 0).count(), 2);

    tokio::time::sleep(Duration::from_millis(450)).await;
    for _ in 0..3 {
        assert_eq!(select(&cluster, ConsistencyLevel::One).await, 10);
    }
    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn read_counters_track_the_serving_replica() {
    let cluster = start(SimulatedClusterConfig::new(3).replication_lag(Duration::ZERO)).await;
    let tablet_id = cluster.tablet_ids("t").await.unwrap().remove(0);

    for _ in 0..5 {
        select(&cluster, ConsistencyLevel::LocalOne).await;
    }
    for _ in 0..6 {
        select(&cluster, ConsistencyLevel::One).await;
    }

    let reads = (0..3)
        .map(|idx| cluster.node_metrics(idx).unwrap().read_ops(&tablet_id).unwrap())
        .collect::<Vec<_>>();
    // Node 0 leads the only tablet.
    assert_eq!(reads, vec![7, 2, 2]);
    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn unsupported_levels_are_rejected_without_serving() {
    let cluster = start(SimulatedClusterConfig::new(3)).await;
    let tablet_id = cluster.tablet_ids("t").await.unwrap().remove(0);

    for level in [ConsistencyLevel::All, ConsistencyLevel::Serial, ConsistencyLevel::Two] {
        let err = cluster
            .execute(&Statement::select_all("t"), level)
            .await
            .unwrap_err();
        assert!(
            matches!(err, HarnessError::ProtocolRejection(ref msg) if msg.contains(level.as_str()))
        );
    }
    for idx in 0..3 {
        assert_eq!(cluster.node_metrics(idx).unwrap().read_ops(&tablet_id).unwrap(), 0);
    }
    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn accept_unsupported_fault_serves_the_read() {
    let cluster = start(
        SimulatedClusterConfig::new(3).read_fault(ReadRoutingFault::AcceptUnsupportedLevels),
    )
    .await;
    insert_rows(&cluster, 3).await;
    assert_eq!(select(&cluster, ConsistencyLevel::EachQuorum).await, 3);
    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn moving_leadership_is_visible_to_rediscovery() {
    let cluster =
        start(SimulatedClusterConfig::new(3).replication_lag(Duration::from_secs(30))).await;
    insert_rows(&cluster, 5).await;
    let model = ClusterTopologyModel::new(Arc::new(cluster.clone()));
    let before = model.discover("t").await.unwrap();
    let old_leader = before.leader().unwrap().rpc_address();
    let new_leader = before.followers().next().unwrap().rpc_address();

    let change = cluster
        .move_tablet_leader("t", &before.id, &new_leader)
        .await
        .unwrap();
    assert_eq!(change.previous_leader, old_leader);
    assert_eq!(change.next_leader, new_leader);
    assert_eq!(change.epoch, 2);
    assert!(change.followers.contains(&old_leader));

    let after = model.discover("t").await.unwrap();
    assert_eq!(after.leader().unwrap().rpc_address(), new_leader);
    // The new leader holds every committed row despite the follower lag.
    assert_eq!(select(&cluster, ConsistencyLevel::Quorum).await, 5);

    let err = cluster
        .move_tablet_leader("t", &before.id, &HostPort::new("127.0.0.1", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Topology(_)));
    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn table_creation_errors() {
    let cluster = start(SimulatedClusterConfig::new(3)).await;
    assert!(
        cluster
            .create_table("t", &test_table_schema(), &CreateTableOptions::default())
            .await
            .is_err()
    );
    assert!(
        cluster
            .create_table(
                "zero",
                &test_table_schema(),
                &CreateTableOptions::default().num_tablets(0)
            )
            .await
            .is_err()
    );

    cluster
        .create_table(
            "kv",
            &test_table_schema(),
            &CreateTableOptions::default().table_type(TableType::Redis),
        )
        .await
        .unwrap();
    let insert = Statement::insert("kv", test_table_schema().column_names(), vec![1, 1, 1]);
    assert!(matches!(
        cluster.execute(&insert, ConsistencyLevel::Quorum).await,
        Err(HarnessError::ExecutionError(_))
    ));
    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn multi_tablet_tables_spread_rows() {
    let config = SimulatedClusterConfig::new(3).replication_lag(Duration::ZERO);
    let cluster = SimulatedCluster::start(config).await.unwrap();
    cluster
        .create_table(
            "wide",
            &test_table_schema(),
            &CreateTableOptions::default().num_tablets(3),
        )
        .await
        .unwrap();
    let columns = test_table_schema().column_names();
    for idx in 0..30 {
        cluster
            .execute(
                &Statement::insert("wide", columns.clone(), vec![idx, idx, idx]),
                ConsistencyLevel::Quorum,
            )
            .await
            .unwrap();
    }
    let rows = cluster
        .execute(&Statement::select_all("wide"), ConsistencyLevel::Quorum)
        .await
        .unwrap()
        .row_count;
    assert_eq!(rows, 30);

    assert_eq!(cluster.tablet_ids("wide").await.unwrap().len(), 3);
    let model = ClusterTopologyModel::new(Arc::new(cluster.clone()));
    assert!(matches!(
        model.discover("wide").await,
        Err(HarnessError::Topology(_))
    ));
    cluster.shutdown().await.unwrap();
}
