use parley_core::{RoomId, UserId};
use parley_server::{ConnectionHandle, RoomDirectory};
use std::collections::HashSet;

use crate::integration::init_tracing;

const PEERS: usize = 64;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_and_leaves_same_room() {
    init_tracing();

    let directory = RoomDirectory::new();
    let room = RoomId::from("R1");

    let mut tasks = Vec::new();
    for i in 0..PEERS {
        let directory = directory.clone();
        let room = room.clone();
        tasks.push(tokio::spawn(async move {
            let (handle, rx) = ConnectionHandle::channel();
            directory.join(&room, &UserId::new(format!("user-{i}")), handle);
            rx
        }));
    }

    let mut receivers = Vec::new();
    for task in tasks {
        receivers.push(task.await.expect("join task"));
    }

    let members = directory.list_members(&room);
    assert_eq!(members.len(), PEERS);
    assert_eq!(members.iter().collect::<HashSet<_>>().len(), PEERS);

    let mut tasks = Vec::new();
    for i in 0..PEERS {
        let directory = directory.clone();
        let room = room.clone();
        tasks.push(tokio::spawn(async move {
            directory.leave(&room, &UserId::new(format!("user-{i}")))
        }));
    }
    for task in tasks {
        assert!(task.await.expect("leave task"));
    }

    assert!(directory.list_members(&room).is_empty());
    assert!(!directory.contains_room(&room));
    drop(receivers);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rooms_are_independent() {
    init_tracing();

    let directory = RoomDirectory::new();

    let mut tasks = Vec::new();
    for r in 0..8 {
        let directory = directory.clone();
        tasks.push(tokio::spawn(async move {
            let room = RoomId::new(format!("room-{r}"));
            let mut receivers = Vec::new();
            for u in 0..8 {
                let (handle, rx) = ConnectionHandle::channel();
                directory.join(&room, &UserId::new(format!("user-{u}")), handle);
                receivers.push(rx);
            }
            for u in 0..4 {
                directory.leave(&room, &UserId::new(format!("user-{u}")));
            }
            receivers
        }));
    }
    for task in tasks {
        task.await.expect("room task");
    }

    assert_eq!(directory.room_count(), 8);
    for r in 0..8 {
        let members = directory.list_members(&RoomId::new(format!("room-{r}")));
        let expected: Vec<UserId> = (4..8).map(|u| UserId::new(format!("user-{u}"))).collect();
        assert_eq!(members, expected);
    }
}
