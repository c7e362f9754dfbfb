//! Spec.md §8 scenario 6: `{App1(root), App2, App3, App4}` each contribute
//! their name (null-terminated) at a fixed slot length; the root's output
//! buffer is the rank-ordered concatenation.
//!
//! Unlike the other collective scenarios, the gathered payload *is* the
//! participant's symbolic name, so the root's team identity can't double as
//! a raw dial address the way it does elsewhere in this crate. Instead this
//! scenario wires up a [`StaticConfiguration`] resolver (spec.md §6.4, C9)
//! mapping the root's symbolic name to its real listen endpoint, so every
//! participant's identity in the team roster is a plain label.
use std::sync::Arc;
use std::thread;

use mtcl_core::collective::{CollectiveKind, GatherOutcome};
use mtcl_core::config::{ComponentConfig, StaticConfiguration};
use mtcl_core::manager::Manager;
use mtcl_core::time::RetryPolicy;

use crate::support::join_with_context;

fn configure_resolver(manager: &Manager, root_name: &str, root_connect_address: &str, root_scheme: &str) {
    let host = root_connect_address
        .strip_prefix(root_scheme)
        .and_then(|rest| rest.strip_prefix(':'))
        .expect("root_connect_address must start with `{root_scheme}:`");
    let component = ComponentConfig {
        name: root_name.to_string(),
        host: Some(host.to_string()),
        protocols: vec![root_scheme.to_string()],
        listen_endpoints: vec![],
    };
    manager.set_configuration(Box::new(StaticConfiguration::from_components(vec![component])));
}

pub fn run_gather_scenario(
    register: impl Fn(&Manager) + Send + Sync + 'static,
    root_listen: &'static str,
    root_connect_address: &'static str,
    root_scheme: &'static str,
    root_name: &'static str,
    non_root_names: &'static [&'static str],
    slot_len: usize,
) -> Vec<u8> {
    let register = Arc::new(register);
    let participants: Vec<String> =
        std::iter::once(root_name.to_string()).chain(non_root_names.iter().map(|s| s.to_string())).collect();
    let size = participants.len();

    let root_register = Arc::clone(&register);
    let root_participants = participants.clone();
    let root = thread::spawn(move || -> Vec<u8> {
        let manager = Manager::new();
        root_register(&manager);
        manager.init("tck-gather-root").unwrap();
        manager.listen(root_listen).unwrap();

        let team = manager
            .create_team(&root_participants, root_name, root_name, CollectiveKind::Gather, RetryPolicy::default())
            .unwrap();

        let mut local_buf = vec![0u8; slot_len];
        let contribution = root_name.as_bytes();
        local_buf[..contribution.len().min(slot_len)].copy_from_slice(&contribution[..contribution.len().min(slot_len)]);

        let mut out_buf = vec![0u8; size * slot_len];
        let outcome = team.context().execute_gather_root(&local_buf, &mut out_buf, slot_len).unwrap();
        assert_eq!(outcome, GatherOutcome::Completed);
        team.context().close().unwrap();
        manager.finalize(true).unwrap();
        out_buf
    });

    let mut non_roots = Vec::with_capacity(non_root_names.len());
    for &name in non_root_names {
        let register = Arc::clone(&register);
        let participants = participants.clone();
        non_roots.push(thread::spawn(move || {
            let manager = Manager::new();
            register(&manager);
            configure_resolver(&manager, root_name, root_connect_address, root_scheme);
            manager.init("tck-gather-non-root").unwrap();

            let team = manager
                .create_team(&participants, root_name, name, CollectiveKind::Gather, RetryPolicy::default())
                .unwrap();

            let mut local_buf = vec![0u8; slot_len];
            let contribution = name.as_bytes();
            local_buf[..contribution.len().min(slot_len)].copy_from_slice(&contribution[..contribution.len().min(slot_len)]);
            team.context().execute_gather_non_root(&local_buf).unwrap();
            team.context().close().unwrap();
            manager.finalize(true).unwrap();
        }));
    }

    for non_root in non_roots {
        join_with_context("gather::non_root", non_root);
    }
    join_with_context("gather::root", root)
}
