//! Front-end talking to real replica servers over HTTP

use minipoints::common::{Error, FanOutMode, Tag, Value};
use minipoints::frontend::{HttpConnector, QuorumCoordinator, StaticResolver, WriteOutcome};
use minipoints::replica::http::{create_router, ReplicaState};
use minipoints::AccountStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct RunningReplica {
    store: Arc<AccountStore>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RunningReplica {
    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

async fn spawn_replica(name: &str) -> (String, RunningReplica) {
    let store = Arc::new(AccountStore::new());
    let router = create_router(ReplicaState {
        store: store.clone(),
        name: name.to_string(),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (
        url,
        RunningReplica {
            store,
            shutdown,
            task,
        },
    )
}

async fn cluster(
    n: usize,
    mode: FanOutMode,
) -> (
    QuorumCoordinator<Arc<StaticResolver>, HttpConnector>,
    Vec<RunningReplica>,
) {
    let resolver = Arc::new(StaticResolver::new());
    let mut replicas = Vec::new();
    let mut names = Vec::new();
    for i in 1..=n {
        let name = format!("Points{}", i);
        let (url, replica) = spawn_replica(&name).await;
        resolver.register(&name, &url);
        replicas.push(replica);
        names.push(name);
    }

    let connector = HttpConnector::new(Duration::from_secs(5)).unwrap();
    let coordinator = QuorumCoordinator::new(resolver, connector, names)
        .unwrap()
        .with_fan_out(mode);
    (coordinator, replicas)
}

fn email(user: &str) -> String {
    format!("{}@{}", user, "example.com")
}

#[tokio::test]
async fn test_update_over_http() {
    for mode in [FanOutMode::Sequential, FanOutMode::Parallel] {
        let (coord, replicas) = cluster(3, mode).await;
        let alice = email("alice");

        coord.activate_user(&alice).await.unwrap();
        assert_eq!(coord.points_balance(&alice).await.unwrap(), 100);

        let outcome = coord.add_points(&alice, 50).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Committed(Value::new(150, Tag::new(1))));
        for replica in &replicas {
            assert_eq!(
                replica.store.get_balance(&alice).unwrap(),
                Value::new(150, Tag::new(1))
            );
        }

        let outcome = coord.spend_points(&alice, 30).await.unwrap();
        assert_eq!(outcome.balance(), Some(120));

        for replica in replicas {
            replica.stop().await;
        }
    }
}

#[tokio::test]
async fn test_faults_cross_the_wire_typed() {
    let (coord, replicas) = cluster(3, FanOutMode::Sequential).await;
    let bob = email("bob");

    assert!(matches!(
        coord.read_latest(&bob).await,
        Err(Error::InvalidEmail(_))
    ));

    coord.activate_user(&bob).await.unwrap();
    assert!(matches!(
        coord.activate_user(&bob).await,
        Err(Error::EmailAlreadyExists(_))
    ));

    match coord.spend_points(&bob, 250).await {
        Err(Error::NotEnoughBalance { balance, requested }) => {
            assert_eq!((balance, requested), (100, 250));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(matches!(coord.ctrl_init(-3).await, Err(Error::BadInit(-3))));

    for replica in replicas {
        replica.stop().await;
    }
}

#[tokio::test]
async fn test_email_with_reserved_characters() {
    let (coord, replicas) = cluster(2, FanOutMode::Sequential).await;
    let tagged = format!("{}@{}", "ana+promo", "example.com");

    coord.activate_user(&tagged).await.unwrap();
    coord.add_points(&tagged, 7).await.unwrap();
    for replica in &replicas {
        assert_eq!(replica.store.get_balance(&tagged).unwrap().balance, 107);
    }

    for replica in replicas {
        replica.stop().await;
    }
}

#[tokio::test]
async fn test_control_plane_over_http() {
    let (coord, replicas) = cluster(3, FanOutMode::Sequential).await;

    assert_eq!(
        coord.ctrl_ping("").await.unwrap(),
        "Hello friend from Points1\nHello friend from Points2\nHello friend from Points3"
    );

    coord.ctrl_init(40).await.unwrap();
    let cy = email("cy");
    coord.activate_user(&cy).await.unwrap();
    assert_eq!(coord.points_balance(&cy).await.unwrap(), 40);

    coord.ctrl_clear().await.unwrap();
    assert!(replicas.iter().all(|r| r.store.is_empty()));
    assert!(replicas.iter().all(|r| r.store.initial_balance() == 100));

    for replica in replicas {
        replica.stop().await;
    }
}

#[tokio::test]
async fn test_stopped_replica_aborts_read() {
    let (coord, mut replicas) = cluster(3, FanOutMode::Sequential).await;
    let dee = email("dee");
    coord.activate_user(&dee).await.unwrap();

    let stopped = replicas.remove(1);
    stopped.stop().await;

    assert!(matches!(
        coord.add_points(&dee, 10).await,
        Err(Error::Coordination(_))
    ));
    for replica in &replicas {
        assert_eq!(
            replica.store.get_balance(&dee).unwrap(),
            Value::new(100, Tag::ZERO)
        );
    }

    for replica in replicas {
        replica.stop().await;
    }
}
