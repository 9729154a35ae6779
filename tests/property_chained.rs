// tests/property_chained.rs

//! Property tests over randomly shaped plans.

mod common;
use crate::common::init_tracing;

use proptest::prelude::*;

use std::collections::VecDeque;

use sequencer::engine::{
    Coordinator, CoordinatorMessage, CoordinatorOptions, CoreCommand, CoreCoordinator,
};
use sequencer::exec::{PrivilegedContext, ThreadDispatcher};
use sequencer::plan::{PlanBuilder, Task, TaskId};
use sequencer::types::{Affinity, Mode};
use sequencer_test_utils::builders::RunLog;

fn affinity() -> impl Strategy<Value = Affinity> {
    prop_oneof![Just(Affinity::Privileged), Just(Affinity::Background)]
}

fn mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::Chained), Just(Mode::Fanout)]
}

/// Feed every completion back to the core as soon as it is dispatched, and
/// return the dispatch order.
fn drive_core(mut core: CoreCoordinator) -> Vec<TaskId> {
    let mut queue = VecDeque::from([CoordinatorMessage::Start]);
    let mut order = Vec::new();

    while let Some(message) = queue.pop_front() {
        let step = core.step(message);
        for command in step.commands {
            match command {
                CoreCommand::Dispatch { task, notify } => {
                    order.push(task.id());
                    if notify {
                        queue.push_back(CoordinatorMessage::TaskCompleted { id: task.id() });
                    }
                }
                CoreCommand::Post(next) => queue.push_back(next),
                CoreCommand::Abort(err) => panic!("unexpected abort: {err}"),
            }
        }
        if !step.keep_running {
            break;
        }
    }

    order
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn core_dispatches_every_task_once_in_plan_order(
        main in prop::collection::vec(affinity(), 0..12),
        pre in prop::option::of(affinity()),
        post in prop::option::of(affinity()),
        mode in mode(),
    ) {
        let mut builder = PlanBuilder::new();
        if let Some(a) = pre {
            builder = builder.with_pre_task(Task::new(a, || {}));
        }
        for a in &main {
            builder = builder.push_task(Task::new(*a, || {}));
        }
        if let Some(a) = post {
            builder = builder.with_post_task(Task::new(a, || {}));
        }
        let plan = builder.build(mode);
        let expected = plan.task_ids();

        let order = drive_core(CoreCoordinator::new(plan));
        prop_assert_eq!(order, expected);
    }

    #[test]
    fn chained_run_never_overlaps_and_keeps_plan_order(
        main in prop::collection::vec(affinity(), 1..6),
    ) {
        init_tracing();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime");
        let context = PrivilegedContext::spawn("ui-prop").expect("privileged context");

        let log = RunLog::new();
        let labels: Vec<String> = (0..main.len()).map(|i| format!("t{i}")).collect();
        let mut builder = PlanBuilder::new();
        for (label, a) in labels.iter().zip(&main) {
            builder = builder.add_task(*a, log.work(label));
        }
        let plan = builder.build(Mode::Chained);

        let coordinator = Coordinator::new(
            plan,
            ThreadDispatcher::new(context.handle()),
            CoordinatorOptions::default(),
        );
        coordinator.handle().start().expect("start");
        let summary = runtime.block_on(coordinator.run()).expect("run");
        context.shutdown();

        prop_assert_eq!(summary.completed, main.len());
        prop_assert_eq!(log.started(), labels.clone());
        prop_assert_eq!(log.finished(), labels);
        prop_assert_eq!(log.max_concurrency(), 1);
        for (i, a) in main.iter().enumerate() {
            let thread = log.thread_of(&format!("t{i}")).unwrap_or_default();
            prop_assert_eq!(thread == "ui-prop", *a == Affinity::Privileged);
        }
    }
}
