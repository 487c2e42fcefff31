// src/event_queue.rs
//! Application-facing event queue.
//!
//! Native events are pulled from the driver lazily: `get_event` only asks the
//! backend when nothing is pending locally. Events posted with `queue_event`
//! are delivered before anything fetched afterwards.

use crate::display::messages::{DriverEvent, MonitorId, WindowId};
use crate::error::{Result, SystemError};
use crate::keys::{KeyModifiers, KeyScancode};
use crate::system::context::Context;
use log::trace;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    KeyDown {
        scancode: KeyScancode,
        modifiers: KeyModifiers,
        /// Raw character from the layout, before dead-key composition.
        unicode: Option<char>,
    },
    KeyUp {
        scancode: KeyScancode,
        modifiers: KeyModifiers,
    },
    /// The user asked to close a display.
    DisplayClosed(WindowId),
    /// The native window changed size. Physical pixels.
    DisplayResized {
        window: WindowId,
        width_px: u32,
        height_px: u32,
    },
    /// The window is now shown on a different monitor. Displays following
    /// the active monitor resolve a new color space from here on.
    DisplayMoved {
        window: WindowId,
        monitor: MonitorId,
    },
    FilesDropped(Vec<PathBuf>),
    /// Posted by the application itself.
    User(u32),
}

impl From<DriverEvent> for Event {
    fn from(event: DriverEvent) -> Self {
        match event {
            DriverEvent::KeyDown {
                scancode,
                modifiers,
                unicode,
            } => Event::KeyDown {
                scancode,
                modifiers,
                unicode,
            },
            DriverEvent::KeyUp {
                scancode,
                modifiers,
            } => Event::KeyUp {
                scancode,
                modifiers,
            },
            DriverEvent::CloseRequested(window) => Event::DisplayClosed(window),
            DriverEvent::Resized {
                window,
                width_px,
                height_px,
            } => Event::DisplayResized {
                window,
                width_px,
                height_px,
            },
            DriverEvent::MonitorChanged { window, monitor } => {
                Event::DisplayMoved { window, monitor }
            }
            DriverEvent::DropFiles(files) => Event::FilesDropped(files),
        }
    }
}

pub struct EventQueue {
    context: Rc<Context>,
    pending: RefCell<VecDeque<Event>>,
}

impl EventQueue {
    pub(crate) fn new(context: Rc<Context>) -> Self {
        Self {
            context,
            pending: RefCell::new(VecDeque::new()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.context.lifetime().is_alive() {
            Ok(())
        } else {
            Err(SystemError::Disposed)
        }
    }

    /// Next event, or `None` when neither the queue nor the backend has one.
    pub fn get_event(&self) -> Result<Option<Event>> {
        self.check()?;
        if self.pending.borrow().is_empty() {
            self.pump()?;
        }
        Ok(self.pending.borrow_mut().pop_front())
    }

    /// Appends an application event behind everything already pending.
    pub fn queue_event(&self, event: Event) -> Result<()> {
        self.check()?;
        self.pump()?;
        self.pending.borrow_mut().push_back(event);
        Ok(())
    }

    /// Drops every pending event, including those still held by the backend.
    pub fn clear(&self) -> Result<()> {
        self.check()?;
        self.pump()?;
        self.pending.borrow_mut().clear();
        Ok(())
    }

    fn pump(&self) -> Result<()> {
        let events = self.context.poll_events()?;
        if !events.is_empty() {
            trace!("EventQueue: fetched {} native event(s)", events.len());
        }
        self.pending
            .borrow_mut()
            .extend(events.into_iter().map(Event::from));
        Ok(())
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}
