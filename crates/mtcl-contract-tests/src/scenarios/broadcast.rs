//! Spec.md §8 scenario 3: one root broadcasts two messages, in order, to
//! every non-root, then closes; each non-root observes both messages and a
//! trailing end-of-stream.
use std::sync::Arc;
use std::thread;

use mtcl_core::collective::CollectiveKind;
use mtcl_core::manager::Manager;
use mtcl_core::time::RetryPolicy;

use crate::support::join_with_context;

pub fn run_broadcast_scenario(
    register: impl Fn(&Manager) + Send + Sync + 'static,
    root_listen: &'static str,
    root_address: &'static str,
    non_root_names: &'static [&'static str],
    messages: &'static [&'static [u8]],
) {
    let register = Arc::new(register);
    let participants: Vec<String> =
        std::iter::once(root_address.to_string()).chain(non_root_names.iter().map(|s| s.to_string())).collect();

    let root_register = Arc::clone(&register);
    let root_participants = participants.clone();
    let root = thread::spawn(move || {
        let manager = Manager::new();
        root_register(&manager);
        manager.init("tck-broadcast-root").unwrap();
        manager.listen(root_listen).unwrap();

        let mut team = manager
            .create_team(&root_participants, root_address, root_address, CollectiveKind::Broadcast, RetryPolicy::default())
            .unwrap();
        assert_eq!(team.rank(), 0);
        assert_eq!(team.size(), root_participants.len());

        for message in messages {
            team.context_mut().send(message).unwrap();
        }
        team.context().close().unwrap();
        manager.finalize(true).unwrap();
    });

    let mut non_roots = Vec::with_capacity(non_root_names.len());
    for &name in non_root_names {
        let register = Arc::clone(&register);
        let participants = participants.clone();
        non_roots.push(thread::spawn(move || {
            let manager = Manager::new();
            register(&manager);
            manager.init("tck-broadcast-non-root").unwrap();

            let mut team = manager
                .create_team(&participants, root_address, name, CollectiveKind::Broadcast, RetryPolicy::default())
                .unwrap();

            for expected in messages {
                let mut buf = vec![0u8; expected.len()];
                let n = team.context_mut().receive(&mut buf).unwrap();
                assert_eq!(&buf[..n], *expected, "{name} must see broadcast messages in root send order");
            }
            // Root's close() emits EOS; a further receive must report 0.
            let mut buf = [0u8; 1];
            assert_eq!(team.context_mut().receive(&mut buf).unwrap(), 0);
            team.context().close().unwrap();
            manager.finalize(true).unwrap();
        }));
    }

    for non_root in non_roots {
        join_with_context("broadcast::non_root", non_root);
    }
    join_with_context("broadcast::root", root);
}
