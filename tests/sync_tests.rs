//! Integration tests for synchronization requests.
//!
//! All tests run against the dummy backend, which records every pool, queue
//! and command buffer action, so the exact barriers and submissions a request
//! produces can be asserted on.
//!
//! # Test Categories
//!
//! - **Classification Tests**: Strategy derived from the configured state
//! - **Hook Tests**: One-shot barrier hooks and command buffer provisioning
//! - **Composition Tests**: Master/auxiliary requests sharing a command buffer
//! - **Finalization Tests**: Behavior of `submit_and_sync` per strategy
//! - **Diagnostics Tests**: Warnings and teardown errors

mod common;

use std::cell::{Cell, RefCell};

use rstest::rstest;

use common::{TestContext, color_image, logs_at, take_logs};
use redlilium_gpu_sync::backend::DummyEvent;
use redlilium_gpu_sync::sync::{AfterOperationHook, BeforeOperationHook};
use redlilium_gpu_sync::{
    CommandBuffer, CommandBufferRequest, HookTransfer, ImageLayout, MemoryAccess, PipelineStage,
    ReadMemoryAccess, SyncContext, SyncRequest, SyncStrategy, WriteMemoryAccess, operations,
    presets,
};

fn build(kind: &str, ctx: &SyncContext) -> SyncRequest<'static> {
    match kind {
        "new" => SyncRequest::new(ctx),
        "no_sync" => SyncRequest::no_sync(ctx),
        "wait_idle" => SyncRequest::wait_idle(ctx, false),
        "wait_idle_deliberately" => SyncRequest::wait_idle(ctx, true),
        "semaphore" => SyncRequest::with_semaphore(ctx, drop),
        "barriers" => SyncRequest::with_barriers(ctx, drop),
        "by_return" => SyncRequest::by_return(ctx),
        other => panic!("unknown request kind {other}"),
    }
}

// ============================================================================
// Classification Tests
// ============================================================================

#[rstest]
#[case::default("new", SyncStrategy::ViaWaitIdle)]
#[case::no_sync("no_sync", SyncStrategy::NotRequired)]
#[case::wait_idle("wait_idle", SyncStrategy::ViaWaitIdle)]
#[case::wait_idle_deliberately("wait_idle_deliberately", SyncStrategy::ViaWaitIdleDeliberately)]
#[case::semaphore("semaphore", SyncStrategy::ViaSemaphore)]
#[case::barriers("barriers", SyncStrategy::ViaBarrier)]
#[case::by_return("by_return", SyncStrategy::ByReturn)]
fn test_classification_is_stable(#[case] kind: &str, #[case] expected: SyncStrategy) {
    let ctx = TestContext::new();
    let mut request = build(kind, &ctx.sync);

    assert_eq!(request.classify(), expected);
    assert_eq!(request.classify(), expected);

    // Configuration calls do not influence the strategy.
    request
        .create_reusable_commandbuffer()
        .on_queue(&ctx.device.queue(1));
    request.set_queue_hint(&ctx.device.queue(2));
    assert_eq!(request.classify(), expected);
    assert!(ctx.events().is_empty());
}

#[test]
fn test_existing_command_buffer_classification() {
    let ctx = TestContext::new();
    let mut cmd = ctx
        .sync
        .pool()
        .allocate(CommandBufferRequest::SingleUse)
        .unwrap();
    cmd.begin_recording().unwrap();

    let mut request = SyncRequest::with_existing_command_buffer(&ctx.sync, &mut cmd);
    assert_eq!(request.classify(), SyncStrategy::ByExistingCommandBuffer);
    assert!(!request.is_auxiliary());
    assert!(request.submit_and_sync().unwrap().is_none());
    drop(request);

    assert_eq!(ctx.submissions(), 0);
    assert!(cmd.is_recording());
}

// ============================================================================
// Hook Tests
// ============================================================================

#[test]
fn test_before_hook_fires_once() {
    let ctx = TestContext::new();
    let mut request = SyncRequest::by_return(&ctx.sync);

    for _ in 0..2 {
        request
            .establish_barrier_before_the_operation(
                PipelineStage::TRANSFER,
                Some(ReadMemoryAccess::TRANSFER),
            )
            .unwrap();
    }

    assert_eq!(ctx.global_barriers(), 1);
    assert!(!request.has_before_hook());
    request.submit_and_sync().unwrap();
}

#[test]
fn test_after_hook_fires_once() {
    let ctx = TestContext::new();
    let fired = Cell::new(0);
    let mut request = SyncRequest::by_return(&ctx.sync).after_operation(|cmd, stage, access| {
        fired.set(fired.get() + 1);
        cmd.establish_global_memory_barrier_rw(
            stage,
            PipelineStage::VERTEX_INPUT,
            access,
            Some(ReadMemoryAccess::ANY),
        );
    });

    for _ in 0..3 {
        request
            .establish_barrier_after_the_operation(
                PipelineStage::COMPUTE_SHADER,
                Some(WriteMemoryAccess::SHADER),
            )
            .unwrap();
    }

    assert_eq!(fired.get(), 1);
    assert!(ctx.events().iter().any(|e| matches!(
        e,
        DummyEvent::GlobalBarrier {
            src_stage: PipelineStage::COMPUTE_SHADER,
            dst_stage: PipelineStage::VERTEX_INPUT,
            src_access: Some(MemoryAccess::SHADER_WRITE),
            ..
        }
    )));
    request.submit_and_sync().unwrap();
}

#[test]
fn test_missing_hook_does_not_provision() {
    let ctx = TestContext::new();
    let mut request = SyncRequest::wait_idle(&ctx.sync, true);

    request
        .establish_barrier_before_the_operation(PipelineStage::TRANSFER, None)
        .unwrap();
    request
        .establish_barrier_after_the_operation(PipelineStage::TRANSFER, None)
        .unwrap();

    assert_eq!(ctx.allocations(), 0);
    assert!(!request.has_pending_command_buffer());
}

#[rstest]
#[case::single_use(false, CommandBufferRequest::SingleUse)]
#[case::reusable(true, CommandBufferRequest::Reusable)]
fn test_command_buffer_is_provisioned_once(
    #[case] reusable: bool,
    #[case] expected: CommandBufferRequest,
) {
    let ctx = TestContext::new();
    let mut request = SyncRequest::by_return(&ctx.sync);
    if reusable {
        request.create_reusable_commandbuffer();
    } else {
        request.create_single_use_commandbuffer();
    }

    let first = request.get_or_create_command_buffer().unwrap().id();
    request
        .establish_barrier_before_the_operation(PipelineStage::TRANSFER, None)
        .unwrap();
    let second = request.get_or_create_command_buffer().unwrap().id();

    assert_eq!(first, second);
    assert_eq!(ctx.allocations(), 1);
    assert_eq!(
        ctx.events()[..2],
        [
            DummyEvent::Allocated {
                command_buffer: first,
                request: expected,
            },
            DummyEvent::BeginRecording {
                command_buffer: first
            },
        ]
    );
    request.submit_and_sync().unwrap();
}

#[test]
fn test_take_transfers_everything() {
    let ctx = TestContext::new();
    let fired = Cell::new(false);
    let mut source = SyncRequest::by_return(&ctx.sync)
        .before_operation(|_, _, _| fired.set(true))
        .wait_for_semaphores([ctx.device.create_semaphore(), ctx.device.create_semaphore()]);
    let cmd_id = source.get_or_create_command_buffer().unwrap().id();

    let mut target = source.take();

    assert_eq!(source.classify(), SyncStrategy::NotRequired);
    assert!(!source.has_before_hook());
    assert!(!source.has_after_hook());
    assert!(!source.has_pending_command_buffer());
    assert_eq!(source.wait_semaphore_count(), 0);

    // The hook moved as well and still fires exactly once.
    source
        .establish_barrier_before_the_operation(PipelineStage::TRANSFER, None)
        .unwrap();
    assert!(!fired.get());
    target
        .establish_barrier_before_the_operation(PipelineStage::TRANSFER, None)
        .unwrap();
    assert!(fired.get());

    assert_eq!(target.wait_semaphore_count(), 2);
    let cmd = target.submit_and_sync().unwrap().unwrap();
    assert_eq!(cmd.id(), cmd_id);
    drop(source);
    assert!(logs_at(log::Level::Error).is_empty());
}

// ============================================================================
// Composition Tests
// ============================================================================

#[test]
fn test_steal_immediately_moves_master_hook() {
    let ctx = TestContext::new();
    let fired = RefCell::new(Vec::new());
    let mut master = SyncRequest::with_barriers(&ctx.sync, drop)
        .before_operation(|_, stage, _| fired.borrow_mut().push(("master-before", stage)))
        .after_operation(|_, stage, _| fired.borrow_mut().push(("master-after", stage)));

    {
        let mut auxiliary = SyncRequest::auxiliary_with_barriers(
            &mut master,
            HookTransfer::StealImmediately,
            HookTransfer::StealImmediately,
        )
        .unwrap();
        assert!(auxiliary.has_before_hook());
        assert!(auxiliary.has_after_hook());

        auxiliary
            .establish_barrier_before_the_operation(PipelineStage::TRANSFER, None)
            .unwrap();
        auxiliary
            .establish_barrier_after_the_operation(PipelineStage::FRAGMENT_SHADER, None)
            .unwrap();
        auxiliary.submit_and_sync().unwrap();
    }

    assert!(!master.has_before_hook());
    assert!(!master.has_after_hook());
    assert_eq!(
        *fired.borrow(),
        [
            ("master-before", PipelineStage::TRANSFER),
            ("master-after", PipelineStage::FRAGMENT_SHADER),
        ]
    );

    assert_eq!(ctx.submissions(), 0);
    master.submit_and_sync().unwrap();
    assert_eq!(ctx.submissions(), 1);
}

#[test]
fn test_steal_on_demand_keeps_master_hook_until_invoked() {
    let ctx = TestContext::new();
    let fired = Cell::new(0);
    let mut master = SyncRequest::by_return(&ctx.sync).after_operation(|_, _, _| {
        fired.set(fired.get() + 1);
    });

    {
        let mut auxiliary = SyncRequest::auxiliary_with_barriers(
            &mut master,
            HookTransfer::None,
            HookTransfer::StealOnDemand,
        )
        .unwrap();
        assert!(auxiliary.has_after_hook());
        assert!(!auxiliary.has_before_hook());
        assert_eq!(fired.get(), 0);

        auxiliary
            .establish_barrier_after_the_operation(PipelineStage::TRANSFER, None)
            .unwrap();
        auxiliary
            .establish_barrier_after_the_operation(PipelineStage::TRANSFER, None)
            .unwrap();
        assert_eq!(fired.get(), 1);
    }

    assert!(!master.has_after_hook());
    // The before-hook was never requested by the auxiliary.
    assert!(master.has_before_hook());
    master.submit_and_sync().unwrap();
}

#[test]
fn test_steal_on_demand_before_auxiliary_invocation() {
    let ctx = TestContext::new();
    let mut master = SyncRequest::by_return(&ctx.sync);

    let auxiliary = SyncRequest::auxiliary_with_barriers(
        &mut master,
        HookTransfer::StealOnDemand,
        HookTransfer::StealOnDemand,
    )
    .unwrap();
    drop(auxiliary);

    // Never invoked, so nothing was stolen.
    assert!(master.has_before_hook());
    assert!(master.has_after_hook());
    master.submit_and_sync().unwrap();
}

#[test]
fn test_auxiliaries_record_in_order_into_master_buffer() {
    let ctx = TestContext::new();
    let src = color_image(1, ImageLayout::ColorAttachment);
    let dst = color_image(2, ImageLayout::Undefined);
    let staging = color_image(3, ImageLayout::General);

    let received = Cell::new(false);
    let mut master = SyncRequest::with_semaphore(&ctx.sync, |_| received.set(true));

    let first = SyncRequest::auxiliary_with_barriers(
        &mut master,
        HookTransfer::Explicit(presets::image_copy::wait_for_previous_operations(&src, &dst)),
        HookTransfer::None,
    )
    .unwrap();
    operations::copy_image(&src, &dst, first).unwrap();

    let second = SyncRequest::auxiliary_with_barriers(
        &mut master,
        HookTransfer::StealImmediately,
        HookTransfer::StealImmediately,
    )
    .unwrap();
    operations::copy_image(&src, &staging, second).unwrap();

    assert_eq!(ctx.allocations(), 1);
    assert_eq!(ctx.submissions(), 0);
    master.submit_and_sync().unwrap();

    assert!(received.get());
    let copies: Vec<_> = ctx
        .events()
        .into_iter()
        .filter_map(|e| match e {
            DummyEvent::CopyImage { src, dst, .. } => Some((src, dst)),
            _ => None,
        })
        .collect();
    assert_eq!(copies, [(1, 2), (1, 3)]);
    assert_eq!(dst.current_layout(), ImageLayout::TransferDst);
}

#[test]
fn test_auxiliary_carries_no_queue_configuration() {
    let ctx = TestContext::new();
    let mut master = SyncRequest::wait_idle(&ctx.sync, true);
    master.on_queue(&ctx.device.queue(3));

    {
        let auxiliary = SyncRequest::auxiliary_with_barriers(
            &mut master,
            HookTransfer::None,
            HookTransfer::None,
        )
        .unwrap();
        assert_eq!(auxiliary.queue_to_use().queue_index(), 0);
    }

    master.submit_and_sync().unwrap();
    assert!(
        ctx.events()
            .contains(&DummyEvent::QueueIdle { queue: 3 })
    );
}

// ============================================================================
// Finalization Tests
// ============================================================================

#[test]
fn test_semaphore_sink_receives_exactly_one_semaphore() {
    let ctx = TestContext::new();
    let received = RefCell::new(Vec::new());
    let mut request = SyncRequest::with_semaphore(&ctx.sync, |semaphore| {
        received.borrow_mut().push(semaphore.id());
    })
    .wait_for_semaphore(ctx.device.create_semaphore());
    request.get_or_create_command_buffer().unwrap();

    request.submit_and_sync().unwrap();

    assert_eq!(received.borrow().len(), 1);
    assert!(!request.has_pending_command_buffer());
    assert_eq!(request.wait_semaphore_count(), 0);
    assert!(request.is_finalized());
}

#[rstest]
#[case::implicit(false, 1)]
#[case::deliberate(true, 0)]
fn test_wait_idle_submits_and_blocks(#[case] deliberately: bool, #[case] warnings: usize) {
    let ctx = TestContext::new();
    let mut request = SyncRequest::wait_idle(&ctx.sync, deliberately);
    let cmd_id = request.get_or_create_command_buffer().unwrap().id();

    request.submit_and_sync().unwrap();

    let events = ctx.events();
    let tail: Vec<_> = events.iter().rev().take(4).rev().cloned().collect();
    assert_eq!(
        tail,
        [
            DummyEvent::EndRecording {
                command_buffer: cmd_id
            },
            DummyEvent::Submitted {
                queue: 0,
                command_buffer: cmd_id,
                wait_semaphores: vec![],
                signal_semaphore: None,
            },
            DummyEvent::QueueIdle { queue: 0 },
            DummyEvent::Released {
                command_buffer: cmd_id
            },
        ]
    );
    assert!(!request.has_pending_command_buffer());
    let idle_warnings = logs_at(log::Level::Warn)
        .iter()
        .filter(|m| m.contains("idle"))
        .count();
    assert_eq!(idle_warnings, warnings);
}

#[test]
fn test_auxiliary_finalization_is_noop() {
    let ctx = TestContext::new();
    let mut master = SyncRequest::by_return(&ctx.sync);

    {
        let mut auxiliary = SyncRequest::auxiliary_with_barriers(
            &mut master,
            HookTransfer::None,
            HookTransfer::None,
        )
        .unwrap();
        auxiliary.create_single_use_commandbuffer();
        assert_eq!(auxiliary.classify(), SyncStrategy::ViaBarrier);
        assert!(auxiliary.submit_and_sync().unwrap().is_none());
    }

    assert_eq!(ctx.submissions(), 0);
    assert!(master.has_pending_command_buffer());
    let cmd = master.submit_and_sync().unwrap().unwrap();
    assert!(!cmd.is_recording());
}

#[test]
fn test_barrier_handoff_receives_submitted_buffer() {
    let ctx = TestContext::new();
    let kept: RefCell<Option<CommandBuffer>> = RefCell::new(None);
    let src = color_image(10, ImageLayout::TransferSrc);
    let dst = color_image(11, ImageLayout::TransferDst);

    let sync = SyncRequest::with_barriers(&ctx.sync, |cmd| {
        *kept.borrow_mut() = Some(cmd);
    })
    .after_operation(presets::image_copy::let_subsequent_operations_wait(&src, &dst));
    assert!(operations::copy_image(&src, &dst, sync).unwrap().is_none());

    let cmd = kept.borrow_mut().take().unwrap();
    assert_eq!(ctx.submissions(), 1);
    assert!(!cmd.is_recording());
    assert_eq!(dst.current_layout(), ImageLayout::ColorAttachment);
}

#[test]
#[should_panic(expected = "provide a concrete synchronization strategy")]
fn test_no_sync_reaching_submission_panics() {
    let ctx = TestContext::new();
    let mut request = SyncRequest::no_sync(&ctx.sync);
    let _ = request.submit_and_sync();
}

#[test]
fn test_submission_failure_is_reported() {
    let ctx = TestContext::new();
    let mut request = SyncRequest::with_semaphore(&ctx.sync, |_| {
        panic!("sink must not run when submission fails");
    });
    request.get_or_create_command_buffer().unwrap();

    ctx.device.fail_next_submission();
    let result = request.submit_and_sync();

    assert!(result.is_err());
    assert!(!request.has_pending_command_buffer());
}

// ============================================================================
// Diagnostics Tests
// ============================================================================

#[test]
fn test_dropping_pending_request_logs_error() {
    let ctx = TestContext::new();
    let mut request = SyncRequest::with_barriers(&ctx.sync, drop);
    request.get_or_create_command_buffer().unwrap();
    drop(request);

    let errors = logs_at(log::Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("never submitted"));
}

#[test]
fn test_dropping_unfetched_by_return_logs_distinct_error() {
    let ctx = TestContext::new();
    let mut request = SyncRequest::by_return(&ctx.sync);
    request.get_or_create_command_buffer().unwrap();
    drop(request);

    let errors = logs_at(log::Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("never fetched"));
}

#[test]
fn test_dropping_unprovisioned_request_is_silent() {
    let ctx = TestContext::new();
    drop(SyncRequest::new(&ctx.sync));
    drop(SyncRequest::no_sync(&ctx.sync));

    assert!(logs_at(log::Level::Error).is_empty());
    assert!(logs_at(log::Level::Warn).is_empty());
}

#[cfg(debug_assertions)]
#[test]
fn test_unfired_hooks_are_noted() {
    let ctx = TestContext::new();
    let request = SyncRequest::with_semaphore(&ctx.sync, drop);
    drop(request);

    let notes = logs_at(log::Level::Debug);
    assert!(notes.iter().any(|m| m.contains("Before-operation")));
    assert!(notes.iter().any(|m| m.contains("After-operation")));
}

#[test]
fn test_unused_wait_semaphores_are_reported() {
    let ctx = TestContext::new();
    let mut request =
        SyncRequest::wait_idle(&ctx.sync, true).wait_for_semaphore(ctx.device.create_semaphore());

    request.submit_and_sync().unwrap();

    assert_eq!(request.wait_semaphore_count(), 0);
    assert!(
        logs_at(log::Level::Warn)
            .iter()
            .any(|m| m.contains("wait semaphore"))
    );
    assert!(ctx.events().iter().all(|e| !matches!(
        e,
        DummyEvent::Submitted { wait_semaphores, .. } if !wait_semaphores.is_empty()
    )));
}

#[test]
fn test_hook_aliases_accept_presets() {
    let ctx = TestContext::new();
    let before: BeforeOperationHook<'_> = presets::default_before_operation();
    let after: AfterOperationHook<'_> = presets::default_after_operation();
    let mut request = SyncRequest::by_return(&ctx.sync)
        .before_operation(before)
        .after_operation(after);

    request
        .establish_barrier_before_the_operation(PipelineStage::TRANSFER, None)
        .unwrap();
    request
        .establish_barrier_after_the_operation(PipelineStage::TRANSFER, None)
        .unwrap();

    assert_eq!(ctx.global_barriers(), 2);
    request.submit_and_sync().unwrap();
    take_logs();
}
