//! Quartz event tap feeding scroll-wheel events into a [`LocalEventMonitor`].
//!
//! Requires Accessibility (or Input Monitoring) permission. The tap is
//! listen-only and runs its own CFRunLoop on a dedicated thread.

use crate::macos::accessibility::Point;
use crate::macos::event_monitor::{EventHandler, EventMonitor, LocalEventMonitor, MonitorToken};
use crate::models::scroll_event::{
    EventMask, InputEvent, ModifierKey, MomentumPhase, ScrollEvent, ScrollPhase,
};
use crate::{Result, TitleSwipeError};
use core_foundation::base::TCFType;
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_foundation_sys::runloop::{CFRunLoopRef, CFRunLoopStop};
use ::core_graphics::display::CGDisplay;
use ::core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventType,
};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, trace};

// CGEventField values for scroll-wheel events
const SCROLL_WHEEL_EVENT_DELTA_AXIS_1: u32 = 11;
const SCROLL_WHEEL_EVENT_DELTA_AXIS_2: u32 = 12;
const SCROLL_WHEEL_EVENT_IS_CONTINUOUS: u32 = 88;
const MOUSE_EVENT_WINDOW_UNDER_MOUSE_POINTER: u32 = 91;
const SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_1: u32 = 96;
const SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_2: u32 = 97;
const SCROLL_WHEEL_EVENT_SCROLL_PHASE: u32 = 99;
const SCROLL_WHEEL_EVENT_MOMENTUM_PHASE: u32 = 123;

// CGScrollPhase
const SCROLL_PHASE_BEGAN: i64 = 1;
const SCROLL_PHASE_CHANGED: i64 = 2;
const SCROLL_PHASE_ENDED: i64 = 4;
const SCROLL_PHASE_CANCELLED: i64 = 8;
const SCROLL_PHASE_MAY_BEGIN: i64 = 128;

// CGMomentumScrollPhase
const MOMENTUM_PHASE_BEGIN: i64 = 1;
const MOMENTUM_PHASE_CONTINUE: i64 = 2;
const MOMENTUM_PHASE_END: i64 = 3;

/// Event monitor backed by a session-level Quartz event tap
pub struct EventTapMonitor {
    dispatcher: Arc<LocalEventMonitor>,
    run_loop: usize,
    thread_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for EventTapMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTapMonitor")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl EventTapMonitor {
    /// Create the tap and start its run loop thread
    pub fn start() -> Result<Self> {
        let dispatcher = Arc::new(LocalEventMonitor::new());
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<usize, String>>();
        let tap_dispatcher = Arc::clone(&dispatcher);

        let thread_handle = thread::Builder::new()
            .name("scroll-event-tap".into())
            .spawn(move || run_tap_loop(tap_dispatcher, ready_tx))
            .map_err(|err| {
                TitleSwipeError::MacOSAPIError(format!(
                    "Failed to spawn event tap thread: {err}"
                ))
            })?;

        let run_loop = match ready_rx.recv() {
            Ok(Ok(run_loop)) => run_loop,
            Ok(Err(message)) => {
                let _ = thread_handle.join();
                return Err(TitleSwipeError::MacOSAPIError(message).into());
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(TitleSwipeError::MacOSAPIError(
                    "Event tap thread exited before reporting readiness".into(),
                )
                .into());
            }
        };

        info!("Scroll event tap started");
        Ok(Self {
            dispatcher,
            run_loop,
            thread_handle: Some(thread_handle),
        })
    }

    fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            unsafe { CFRunLoopStop(self.run_loop as CFRunLoopRef) };
            if handle.join().is_err() {
                error!("Event tap thread panicked during shutdown");
            }
            info!("Scroll event tap stopped");
        }
    }
}

impl Drop for EventTapMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl EventMonitor for EventTapMonitor {
    fn add_global_monitor(&self, mask: EventMask, handler: EventHandler) -> Result<MonitorToken> {
        self.dispatcher.add_global_monitor(mask, handler)
    }

    fn remove_monitor(&self, token: MonitorToken) -> Result<()> {
        self.dispatcher.remove_monitor(token)
    }
}

fn run_tap_loop(
    dispatcher: Arc<LocalEventMonitor>,
    ready: mpsc::Sender<std::result::Result<usize, String>>,
) {
    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::ScrollWheel],
        move |_proxy, event_type, event: &CGEvent| {
            if let CGEventType::ScrollWheel = event_type {
                let scroll = translate_scroll_event(event);
                trace!(window_id = scroll.window_id, "Captured scroll event");
                dispatcher.post(&InputEvent::ScrollWheel(scroll));
            }
            None
        },
    );

    let tap = match tap {
        Ok(tap) => tap,
        Err(()) => {
            let _ = ready.send(Err(
                "CGEventTapCreate failed; grant Accessibility permission and retry".into(),
            ));
            return;
        }
    };

    let source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err("Failed to create run loop source for event tap".into()));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }
    tap.enable();

    if ready
        .send(Ok(run_loop.as_concrete_TypeRef() as usize))
        .is_err()
    {
        return;
    }

    CFRunLoop::run_current();
}

fn translate_scroll_event(event: &CGEvent) -> ScrollEvent {
    let has_precise_deltas = event.get_integer_value_field(SCROLL_WHEEL_EVENT_IS_CONTINUOUS) != 0;
    let (delta_x, delta_y) = if has_precise_deltas {
        (
            event.get_integer_value_field(SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_2) as f64,
            event.get_integer_value_field(SCROLL_WHEEL_EVENT_POINT_DELTA_AXIS_1) as f64,
        )
    } else {
        (
            event.get_integer_value_field(SCROLL_WHEEL_EVENT_DELTA_AXIS_2) as f64,
            event.get_integer_value_field(SCROLL_WHEEL_EVENT_DELTA_AXIS_1) as f64,
        )
    };

    // Quartz locations are top-left origin; events carry Cocoa coordinates
    let quartz = event.location();
    let main_height = CGDisplay::main().bounds().size.height;

    ScrollEvent {
        delta_x,
        delta_y,
        phase: scroll_phase(event.get_integer_value_field(SCROLL_WHEEL_EVENT_SCROLL_PHASE)),
        momentum_phase: momentum_phase(
            event.get_integer_value_field(SCROLL_WHEEL_EVENT_MOMENTUM_PHASE),
        ),
        has_precise_deltas,
        window_id: event.get_integer_value_field(MOUSE_EVENT_WINDOW_UNDER_MOUSE_POINTER) as u32,
        location: Point::new(quartz.x, main_height - quartz.y),
        modifiers: modifiers_from_flags(event.get_flags()),
    }
}

fn scroll_phase(raw: i64) -> ScrollPhase {
    match raw {
        SCROLL_PHASE_BEGAN => ScrollPhase::Began,
        SCROLL_PHASE_CHANGED => ScrollPhase::Changed,
        SCROLL_PHASE_ENDED => ScrollPhase::Ended,
        SCROLL_PHASE_CANCELLED => ScrollPhase::Cancelled,
        SCROLL_PHASE_MAY_BEGIN => ScrollPhase::MayBegin,
        _ => ScrollPhase::None,
    }
}

fn momentum_phase(raw: i64) -> MomentumPhase {
    match raw {
        MOMENTUM_PHASE_BEGIN => MomentumPhase::Began,
        MOMENTUM_PHASE_CONTINUE => MomentumPhase::Changed,
        MOMENTUM_PHASE_END => MomentumPhase::Ended,
        _ => MomentumPhase::None,
    }
}

fn modifiers_from_flags(flags: CGEventFlags) -> Vec<ModifierKey> {
    let mut modifiers = Vec::new();
    if flags.contains(CGEventFlags::CGEventFlagCommand) {
        modifiers.push(ModifierKey::Command);
    }
    if flags.contains(CGEventFlags::CGEventFlagAlternate) {
        modifiers.push(ModifierKey::Option);
    }
    if flags.contains(CGEventFlags::CGEventFlagControl) {
        modifiers.push(ModifierKey::Control);
    }
    if flags.contains(CGEventFlags::CGEventFlagShift) {
        modifiers.push(ModifierKey::Shift);
    }
    if flags.contains(CGEventFlags::CGEventFlagSecondaryFn) {
        modifiers.push(ModifierKey::Function);
    }
    modifiers
}
