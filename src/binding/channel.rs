//! Per-control synchronization actor.
//!
//! Each bound control gets a task reacting to two messages: a committed
//! local edit (push to the store) and a store change notification (pull
//! into the control). The pull path writes straight into the control state
//! and never goes back through commit dispatch, so the two paths cannot
//! trigger each other.

use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::binding::registry::{BindingId, BindingRegistry};
use crate::error::DesignerError;
use crate::field::codec::{Applied, decode_into};
use crate::field::control::CommitEvent;
use crate::field::field_model::{Binding, FieldDescriptor, FieldKind};
use crate::session::workspace::Workspace;
use crate::store::adapter::{ChangeHandler, StoreAdapter};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{SyncDirection, SyncEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// User committed an edit; carries the encoded scalar
    LocalChange(String),
    /// Store reported a change on the bound location
    ExternalChange,
}

/// Everything a channel task shares with the editing session.
pub struct ChannelContext<A> {
    pub store: Rc<A>,
    pub workspace: Rc<RefCell<Workspace>>,
    pub tracer: Rc<TraceLogger>,
}

impl<A> Clone for ChannelContext<A> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            workspace: Rc::clone(&self.workspace),
            tracer: Rc::clone(&self.tracer),
        }
    }
}

/// Live binding between one control and one store address.
pub struct BindingChannel {
    field_id: String,
    binding_id: BindingId,
    commit_event: Option<CommitEvent>,
    subscribed: bool,
    tx: UnboundedSender<ChannelMessage>,
    task: JoinHandle<()>,
}

impl BindingChannel {
    /// Attach a channel for `field` to `binding.address`.
    ///
    /// The caller detaches any previous channel for the field first. The
    /// store subscription is only made for listening bindings on a ready
    /// store; everything else still pushes local edits. Must run inside a
    /// `tokio::task::LocalSet`.
    pub async fn attach<A>(
        ctx: &ChannelContext<A>,
        registry: &mut BindingRegistry,
        field: &FieldDescriptor,
        binding: &Binding,
    ) -> BindingChannel
    where
        A: StoreAdapter + 'static,
    {
        let mut binding_id = registry.register(&field.id);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribed = false;

        if binding.listen && ctx.store.is_ready() {
            match ctx.store.ensure_binding(&binding.address, &binding_id).await {
                Ok(effective) => {
                    if effective != binding_id {
                        registry.assign(&field.id, effective.clone());
                        binding_id = effective;
                    }

                    let notify = tx.clone();
                    let handler: ChangeHandler = Rc::new(move |_: &BindingId| {
                        let _ = notify.send(ChannelMessage::ExternalChange);
                    });

                    match ctx.store.subscribe(&binding_id, handler) {
                        Ok(()) => {
                            subscribed = true;
                            // bring the control in line with the store right away
                            let _ = tx.send(ChannelMessage::ExternalChange);
                        }
                        Err(e) => {
                            warn!(field = %field.id, binding = %binding_id, error = %e, "subscribe failed")
                        }
                    }
                }
                Err(e) => {
                    warn!(field = %field.id, address = %binding.address, error = %e, "could not create store binding")
                }
            }
        }

        let task = tokio::task::spawn_local(run_channel(
            ctx.clone(),
            field.id.clone(),
            binding_id.clone(),
            field.kind,
            binding.address.clone(),
            rx,
        ));

        debug!(
            field = %field.id,
            binding = %binding_id,
            address = %binding.address,
            listening = subscribed,
            "binding channel attached"
        );

        BindingChannel {
            field_id: field.id.clone(),
            binding_id,
            commit_event: field.kind.commit_event(),
            subscribed,
            tx,
            task,
        }
    }

    /// Whether `event` is the one this control commits edits with.
    pub fn accepts(&self, event: CommitEvent) -> bool {
        self.commit_event == Some(event)
    }

    /// Queue an encoded local edit for the store.
    pub fn push(&self, scalar: String) {
        let _ = self.tx.send(ChannelMessage::LocalChange(scalar));
    }

    /// Drop the store subscription and stop the task. Synchronous, so no
    /// notification can reach the control once this returns.
    pub fn detach<A: StoreAdapter>(self, store: &A) {
        if self.subscribed {
            store.unsubscribe(&self.binding_id);
        }
        debug!(field = %self.field_id, binding = %self.binding_id, "binding channel detached");
        // task is aborted on drop
    }
}

impl Drop for BindingChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_channel<A: StoreAdapter>(
    ctx: ChannelContext<A>,
    field_id: String,
    binding_id: BindingId,
    kind: FieldKind,
    address: String,
    mut rx: UnboundedReceiver<ChannelMessage>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            ChannelMessage::LocalChange(scalar) => {
                if let Err(e) = push_value(&ctx, &field_id, Some(&binding_id), &address, &scalar).await {
                    warn!(field = %field_id, error = %e, "binding write dropped");
                }
            }
            ChannelMessage::ExternalChange => {
                if let Err(e) = pull_value(&ctx, &field_id, Some(&binding_id), kind, &address).await {
                    warn!(field = %field_id, error = %e, "binding refresh dropped");
                }
            }
        }
    }
}

fn sync_event(
    direction: SyncDirection,
    field_id: &str,
    binding_id: Option<&BindingId>,
    address: &str,
) -> SyncEvent {
    let event = SyncEvent::now(direction)
        .with_field(field_id)
        .with_address(address);
    match binding_id {
        Some(binding_id) => event.with_binding(binding_id),
        None => event,
    }
}

/// Write an encoded control value to the store.
pub async fn push_value<A: StoreAdapter>(
    ctx: &ChannelContext<A>,
    field_id: &str,
    binding_id: Option<&BindingId>,
    address: &str,
    scalar: &str,
) -> Result<(), DesignerError> {
    let event = sync_event(SyncDirection::Push, field_id, binding_id, address);

    match ctx.store.write(address, scalar).await {
        Ok(()) => {
            debug!(field = field_id, address, "control -> store");
            ctx.tracer.log(&event.with_detail(scalar));
            Ok(())
        }
        Err(source) => {
            ctx.tracer.log(&event.failed(&source));
            Err(DesignerError::BindingWriteFailed {
                address: address.to_string(),
                source,
            })
        }
    }
}

/// Read the store value and apply it to the control without dispatching a
/// commit event. On read failure the control is left unchanged.
pub async fn pull_value<A: StoreAdapter>(
    ctx: &ChannelContext<A>,
    field_id: &str,
    binding_id: Option<&BindingId>,
    kind: FieldKind,
    address: &str,
) -> Result<Applied, DesignerError> {
    let event = sync_event(SyncDirection::Pull, field_id, binding_id, address);

    let scalar = match ctx.store.read(address).await {
        Ok(v) => v,
        Err(source) => {
            ctx.tracer.log(&event.failed(&source));
            return Err(DesignerError::BindingReadFailed {
                address: address.to_string(),
                source,
            });
        }
    };

    let applied = {
        let mut workspace = ctx.workspace.borrow_mut();
        let control = workspace
            .controls
            .get_mut(field_id)
            .ok_or_else(|| DesignerError::UnknownField(field_id.to_string()))?;
        decode_into(kind, &scalar, control)?
    };

    debug!(field = field_id, address, ?applied, "store -> control");
    ctx.tracer.log(&event.with_detail(format!("{:?}", applied)));
    Ok(applied)
}
