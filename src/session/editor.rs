use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::autosave::scheduler::{AutoSaveConfig, AutoSaveScheduler, DEFAULT_SAVE_DELAY, SaveStatus};
use crate::binding::address::validate_address;
use crate::binding::channel::{BindingChannel, ChannelContext, pull_value, push_value};
use crate::binding::registry::{BindingId, BindingRegistry, DEFAULT_BINDING_PREFIX};
use crate::design::design_model::{FormDesign, GlobalSettings, LayoutMode};
use crate::design::placement::snap_to_grid;
use crate::document::serializer::{deserialize, serialize};
use crate::error::DesignerError;
use crate::field::codec::{Applied, encode};
use crate::field::control::{CommitEvent, Control, ControlValue};
use crate::field::field_model::{
    Binding, FieldDescriptor, FieldKind, Position, generate_field_id,
};
use crate::session::workspace::Workspace;
use crate::store::adapter::{PERSISTENCE_ADDRESS, StoreAdapter};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{SyncDirection, SyncEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub autosave_enabled: bool,
    pub autosave_delay: Duration,
    pub persistence_address: String,
    pub binding_prefix: String,
    pub trace_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_delay: DEFAULT_SAVE_DELAY,
            persistence_address: PERSISTENCE_ADDRESS.to_string(),
            binding_prefix: DEFAULT_BINDING_PREFIX.to_string(),
            trace_path: None,
        }
    }
}

/// One editing session: owns the design, the live controls, the binding
/// registry and one channel per bound field.
///
/// Every design mutation schedules an autosave. Must be created and used
/// inside a `tokio::task::LocalSet`.
pub struct DesignSession<A: StoreAdapter + 'static> {
    ctx: ChannelContext<A>,
    registry: BindingRegistry,
    channels: HashMap<String, BindingChannel>,
    autosave: AutoSaveScheduler,
    config: SessionConfig,
}

impl<A: StoreAdapter + 'static> DesignSession<A> {
    pub fn new(store: Rc<A>, config: SessionConfig) -> Self {
        Self::with_design(store, FormDesign::new(), config)
    }

    /// Start a session on an existing design. Bindings are not attached
    /// until [`DesignSession::attach_all`] runs.
    pub fn with_design(store: Rc<A>, design: FormDesign, config: SessionConfig) -> Self {
        let tracer = Rc::new(match &config.trace_path {
            Some(path) => TraceLogger::new(path),
            None => TraceLogger::disabled(),
        });
        let workspace = Rc::new(RefCell::new(Workspace::new(design)));

        let source = {
            let workspace = Rc::clone(&workspace);
            move || serialize(&workspace.borrow().design)
        };
        let autosave = AutoSaveScheduler::spawn(
            Rc::clone(&store),
            source,
            AutoSaveConfig {
                delay: config.autosave_delay,
                address: config.persistence_address.clone(),
            },
            Rc::clone(&tracer),
        );

        Self {
            ctx: ChannelContext {
                store,
                workspace,
                tracer,
            },
            registry: BindingRegistry::new(config.binding_prefix.clone()),
            channels: HashMap::new(),
            autosave,
            config,
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn design(&self) -> Ref<'_, FormDesign> {
        Ref::map(self.ctx.workspace.borrow(), |w| &w.design)
    }

    pub fn field(&self, id: &str) -> Option<FieldDescriptor> {
        self.design().field(id).cloned()
    }

    pub fn control(&self, id: &str) -> Option<Control> {
        self.ctx.workspace.borrow().controls.get(id).cloned()
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn store(&self) -> &A {
        &self.ctx.store
    }

    pub fn is_attached(&self, field_id: &str) -> bool {
        self.channels.contains_key(field_id)
    }

    pub fn attached_count(&self) -> usize {
        self.channels.len()
    }

    pub fn save_status(&self) -> watch::Receiver<SaveStatus> {
        self.autosave.status()
    }

    pub fn current_save_status(&self) -> SaveStatus {
        self.autosave.current_status()
    }

    pub fn save_count(&self) -> u64 {
        self.autosave.save_count()
    }

    // ========================================================================
    // Design editing
    // ========================================================================

    fn mutated(&self) {
        if self.config.autosave_enabled {
            self.autosave.notify_mutated();
        }
    }

    /// Append a new default field of `kind` (flow placement).
    pub fn add_field(&mut self, kind: FieldKind) -> String {
        let field = FieldDescriptor::new(kind, generate_field_id(kind));
        self.insert_field(field)
    }

    /// Drop a new field at `position`, snapped to the grid when asked. In
    /// flow layout the position is ignored and the field is appended.
    pub fn add_field_at(&mut self, kind: FieldKind, position: Position, snap: bool) -> String {
        let position = self.snapped(position, snap);
        let field = FieldDescriptor::new(kind, generate_field_id(kind)).with_position(position);
        self.insert_field(field)
    }

    /// Append a prepared descriptor. Its span is clamped to the column
    /// count and its position dropped unless the layout is free.
    pub fn insert_field(&mut self, mut field: FieldDescriptor) -> String {
        let id = field.id.clone();
        {
            let mut workspace = self.ctx.workspace.borrow_mut();
            workspace.design.global.conform(&mut field);
            workspace
                .controls
                .insert(id.clone(), Control::for_field(&field));
            workspace.design.fields.push(field);
        }
        debug!(field = %id, "field added");
        self.mutated();
        id
    }

    /// Edit a field's metadata. The span is re-clamped and the control
    /// re-rendered. Id and kind are fixed at creation; binding changes go
    /// through [`DesignSession::bind`].
    pub fn update_field<F>(&mut self, id: &str, edit: F) -> Result<(), DesignerError>
    where
        F: FnOnce(&mut FieldDescriptor),
    {
        {
            let mut workspace = self.ctx.workspace.borrow_mut();
            let global = workspace.design.global.clone();
            let field = workspace
                .design
                .field_mut(id)
                .ok_or_else(|| DesignerError::UnknownField(id.to_string()))?;
            let (kind, binding) = (field.kind, field.binding.clone());
            edit(field);
            field.id = id.to_string();
            field.kind = kind;
            field.binding = binding;
            global.conform(field);
            workspace.refresh_control(id);
        }
        self.mutated();
        Ok(())
    }

    /// Reorder a field in flow layout.
    pub fn move_field(&mut self, id: &str, index: usize) -> Result<(), DesignerError> {
        let moved = self.ctx.workspace.borrow_mut().design.move_field(id, index);
        if !moved {
            return Err(DesignerError::UnknownField(id.to_string()));
        }
        self.mutated();
        Ok(())
    }

    /// Drag a field to an absolute position in free layout. Flow layout
    /// keeps no positions, so there it only checks the field exists.
    pub fn move_field_to(
        &mut self,
        id: &str,
        position: Position,
        snap: bool,
    ) -> Result<(), DesignerError> {
        let position = self.snapped(position, snap);
        let moved = self
            .ctx
            .workspace
            .borrow_mut()
            .design
            .set_position(id, position);
        if !moved {
            return Err(DesignerError::UnknownField(id.to_string()));
        }
        self.mutated();
        Ok(())
    }

    fn snapped(&self, position: Position, snap: bool) -> Position {
        if snap {
            snap_to_grid(position, self.design().global.grid_size)
        } else {
            position
        }
    }

    /// Remove a field. Its channel is detached first so no subscription
    /// outlives the control.
    pub fn delete_field(&mut self, id: &str) -> Result<FieldDescriptor, DesignerError> {
        self.detach(id);
        self.registry.remove(id);

        let removed = {
            let mut workspace = self.ctx.workspace.borrow_mut();
            let removed = workspace.design.remove_field(id);
            workspace.controls.remove(id);
            removed
        };
        let removed = removed.ok_or_else(|| DesignerError::UnknownField(id.to_string()))?;

        debug!(field = %id, "field deleted");
        self.mutated();
        Ok(removed)
    }

    /// Change the column count; every span is re-clamped.
    pub fn set_columns(&mut self, columns: u32) {
        self.ctx.workspace.borrow_mut().design.set_columns(columns);
        self.mutated();
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        self.ctx.workspace.borrow_mut().design.set_layout_mode(mode);
        self.mutated();
    }

    /// Edit background, size, padding and grid settings. Column count and
    /// layout mode keep their own operations so their invariants hold.
    pub fn update_global<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut GlobalSettings),
    {
        {
            let mut workspace = self.ctx.workspace.borrow_mut();
            let global = &mut workspace.design.global;
            let (columns, layout) = (global.columns, global.layout);
            edit(global);
            global.columns = columns;
            global.layout = layout;
        }
        self.mutated();
    }

    /// Remove every field; global settings stay.
    pub fn clear(&mut self) {
        self.detach_all();
        self.registry.clear();
        {
            let mut workspace = self.ctx.workspace.borrow_mut();
            workspace.design.fields.clear();
            workspace.controls.clear();
        }
        info!("design cleared");
        self.mutated();
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Bind a field to `address` and (re)attach its channel. A blank
    /// address unbinds the field.
    pub async fn bind(
        &mut self,
        id: &str,
        address: &str,
        listen: bool,
    ) -> Result<(), DesignerError> {
        let address = validate_address(address)?;
        {
            let mut workspace = self.ctx.workspace.borrow_mut();
            let field = workspace
                .design
                .field_mut(id)
                .ok_or_else(|| DesignerError::UnknownField(id.to_string()))?;
            field.binding = address.map(|a| Binding::new(a, listen));
        }

        self.attach(id).await;
        self.mutated();
        Ok(())
    }

    /// (Re)attach the channel for one field from its current binding.
    /// Idempotent: the previous channel is always torn down first.
    pub async fn attach(&mut self, id: &str) {
        self.detach(id);

        let Some(field) = self.field(id) else {
            return;
        };
        let Some(binding) = field.binding.clone().filter(|b| !b.address.is_empty()) else {
            self.registry.remove(id);
            return;
        };

        let channel = BindingChannel::attach(&self.ctx, &mut self.registry, &field, &binding).await;
        self.channels.insert(id.to_string(), channel);
    }

    /// Attach channels for every bound field.
    pub async fn attach_all(&mut self) {
        let ids: Vec<String> = self
            .design()
            .fields
            .iter()
            .filter(|f| f.bound_address().is_some())
            .map(|f| f.id.clone())
            .collect();
        for id in ids {
            self.attach(&id).await;
        }
    }

    /// Tear down a field's channel. No-op when it has none.
    pub fn detach(&mut self, id: &str) {
        if let Some(channel) = self.channels.remove(id) {
            channel.detach(self.ctx.store.as_ref());
        }
    }

    fn detach_all(&mut self) {
        for (_, channel) in self.channels.drain() {
            channel.detach(self.ctx.store.as_ref());
        }
    }

    // ========================================================================
    // Control interaction
    // ========================================================================

    /// A user edit on a control. The value is shown immediately; when the
    /// event is the control's commit event and the field is bound, the
    /// encoded value is queued for the store.
    pub fn commit_control(
        &mut self,
        id: &str,
        value: ControlValue,
        event: CommitEvent,
    ) -> Result<(), DesignerError> {
        let kind = {
            let mut workspace = self.ctx.workspace.borrow_mut();
            let control = workspace
                .controls
                .get_mut(id)
                .ok_or_else(|| DesignerError::UnknownField(id.to_string()))?;
            if !value.fits(control.kind) {
                return Err(DesignerError::ValueKindMismatch(control.kind));
            }
            control.value = value;
            control.kind
        };

        let Some(channel) = self.channels.get(id) else {
            return Ok(());
        };
        if !channel.accepts(event) {
            return Ok(());
        }

        let scalar = {
            let workspace = self.ctx.workspace.borrow();
            let control = workspace
                .controls
                .get(id)
                .ok_or_else(|| DesignerError::UnknownField(id.to_string()))?;
            encode(kind, &control.value)?
        };
        channel.push(scalar);
        Ok(())
    }

    fn bound(&self, id: &str) -> Result<(FieldKind, String), DesignerError> {
        let design = self.design();
        let field = design
            .field(id)
            .ok_or_else(|| DesignerError::UnknownField(id.to_string()))?;
        let address = field
            .bound_address()
            .ok_or_else(|| DesignerError::NoBindingAddress(id.to_string()))?;
        Ok((field.kind, address.to_string()))
    }

    /// Force a control -> store write. Store failures are logged and
    /// reported as `Ok(false)`.
    pub async fn push_control(&mut self, id: &str) -> Result<bool, DesignerError> {
        let (kind, address) = self.bound(id)?;
        let scalar = {
            let workspace = self.ctx.workspace.borrow();
            let control = workspace
                .controls
                .get(id)
                .ok_or_else(|| DesignerError::UnknownField(id.to_string()))?;
            encode(kind, &control.value)?
        };

        let binding_id = self.registry.lookup(id).cloned();
        match push_value(&self.ctx, id, binding_id.as_ref(), &address, &scalar).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(field = %id, error = %e, "manual push failed");
                Ok(false)
            }
        }
    }

    /// Force a store -> control refresh. Store failures are logged and
    /// reported as `Ok(None)`; the control is left unchanged.
    pub async fn pull_control(&mut self, id: &str) -> Result<Option<Applied>, DesignerError> {
        let (kind, address) = self.bound(id)?;
        let binding_id = self.registry.lookup(id).cloned();
        match pull_value(&self.ctx, id, binding_id.as_ref(), kind, &address).await {
            Ok(applied) => Ok(Some(applied)),
            Err(e @ DesignerError::BindingReadFailed { .. }) => {
                warn!(field = %id, error = %e, "manual pull failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Refresh whichever control owns `binding_id`.
    pub async fn refresh_binding(
        &mut self,
        binding_id: &BindingId,
    ) -> Result<Option<Applied>, DesignerError> {
        let id = self
            .registry
            .reverse_lookup(binding_id)
            .map(str::to_string)
            .ok_or_else(|| DesignerError::UnknownField(binding_id.to_string()))?;
        self.pull_control(&id).await
    }

    // ========================================================================
    // Documents and persistence
    // ========================================================================

    pub fn export(&self) -> Result<String, DesignerError> {
        serialize(&self.design())
    }

    /// Replace the whole design with a parsed document. On a malformed
    /// document nothing changes.
    pub async fn import(&mut self, text: &str) -> Result<(), DesignerError> {
        let design = deserialize(text)?;
        self.replace_design(design).await;
        self.mutated();
        Ok(())
    }

    async fn replace_design(&mut self, design: FormDesign) {
        self.detach_all();
        self.registry.clear();
        {
            let mut workspace = self.ctx.workspace.borrow_mut();
            workspace.design = design;
            workspace.rebuild_controls();
        }
        self.attach_all().await;
        info!(fields = self.design().fields.len(), "design replaced");
    }

    /// Load the design persisted in the store, typically at startup.
    ///
    /// Returns `Ok(false)` when nothing is stored. A malformed stored
    /// document is reported and the current design kept.
    pub async fn load_from_store(&mut self) -> Result<bool, DesignerError> {
        let address = self.config.persistence_address.clone();
        let event = SyncEvent::now(SyncDirection::Load).with_address(&address);

        let raw = match self.ctx.store.read(&address).await {
            Ok(raw) => raw,
            Err(source) => {
                warn!(%address, error = %source, "could not read saved design");
                self.ctx.tracer.log(&event.failed(&source));
                return Err(DesignerError::BindingReadFailed { address, source });
            }
        };

        if raw.trim().is_empty() {
            info!(%address, "no saved design found");
            self.ctx.tracer.log(&event.with_detail("empty"));
            return Ok(false);
        }

        match deserialize(&raw) {
            Ok(design) => {
                self.replace_design(design).await;
                self.ctx.tracer.log(&event);
                Ok(true)
            }
            Err(e) => {
                warn!(%address, error = %e, "saved design is unreadable");
                self.ctx.tracer.log(&event.failed(&e));
                Err(e)
            }
        }
    }

    /// Save now through the autosave path.
    pub async fn save_now(&self) -> Result<(), DesignerError> {
        self.autosave.flush().await
    }

    /// Detach every channel and let a pending autosave complete.
    pub async fn shutdown(mut self) {
        self.detach_all();
        let DesignSession { autosave, .. } = self;
        autosave.shutdown().await;
    }
}
