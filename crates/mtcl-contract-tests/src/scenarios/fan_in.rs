//! Spec.md §8 scenario 4: `N` producers each send a share of `1..=total`,
//! then close; the root accumulates until the participant set empties.
use std::sync::Arc;
use std::thread;

use mtcl_core::collective::CollectiveKind;
use mtcl_core::manager::Manager;
use mtcl_core::time::RetryPolicy;

use crate::support::join_with_context;

pub fn run_fan_in_sum_scenario(
    register: impl Fn(&Manager) + Send + Sync + 'static,
    root_listen: &'static str,
    root_address: &'static str,
    non_root_names: &'static [&'static str],
    total: u64,
) -> u64 {
    let register = Arc::new(register);
    let participants: Vec<String> =
        std::iter::once(root_address.to_string()).chain(non_root_names.iter().map(|s| s.to_string())).collect();
    let n = non_root_names.len() as u64;
    let per_producer = total.div_ceil(n);

    let root_register = Arc::clone(&register);
    let root_participants = participants.clone();
    let root = thread::spawn(move || -> u64 {
        let manager = Manager::new();
        root_register(&manager);
        manager.init("tck-fan-in-root").unwrap();
        manager.listen(root_listen).unwrap();

        let mut team = manager
            .create_team(&root_participants, root_address, root_address, CollectiveKind::FanIn, RetryPolicy::default())
            .unwrap();

        let mut sum = 0u64;
        loop {
            let mut buf = [0u8; 8];
            let got = team.context_mut().receive_fan_in(&mut buf, true).unwrap();
            if got == 0 {
                break;
            }
            sum += u64::from_be_bytes(buf);
        }
        team.context().close().unwrap();
        manager.finalize(true).unwrap();
        sum
    });

    let mut producers = Vec::with_capacity(non_root_names.len());
    for (idx, &name) in non_root_names.iter().enumerate() {
        let register = Arc::clone(&register);
        let participants = participants.clone();
        let start = 1 + idx as u64 * per_producer;
        let end = total.min(start + per_producer - 1);
        producers.push(thread::spawn(move || {
            let manager = Manager::new();
            register(&manager);
            manager.init("tck-fan-in-producer").unwrap();

            let mut team = manager
                .create_team(&participants, root_address, name, CollectiveKind::FanIn, RetryPolicy::default())
                .unwrap();
            if start <= end {
                for value in start..=end {
                    team.context_mut().send(&value.to_be_bytes()).unwrap();
                }
            }
            team.context().close().unwrap();
            manager.finalize(true).unwrap();
        }));
    }

    for producer in producers {
        join_with_context("fan_in::producer", producer);
    }
    join_with_context("fan_in::root", root)
}
