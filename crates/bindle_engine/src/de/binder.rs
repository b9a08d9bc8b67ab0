use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;
use core::marker::PhantomData;

use serde_core::Deserializer;
use serde_core::de::{self, DeserializeSeed, Visitor};

use super::bean_visitor::BodySeed;
use super::context::DecodeContext;
use super::input::{EntrySource, Replay};
use super::typed::TypedSeed;
use crate::error::{BindError, CreateError};
use crate::model::{
    AnySetterKind, BeanModel, Consumer, PropertyBinding, PropertyLocation, PropertyModel,
    PropertyOrigin, UnwrappedModel, UnwrappedTarget,
};
use crate::refs::{OwnerHandle, ReferenceFrame};
use crate::registry::{BoxedValue, TypeMeta, TypeRef};
use crate::value::Value;

// -----------------------------------------------------------------------------
// BeanBinder

enum Instance<'b> {
    /// Created from the collected arguments once the object ends.
    Pending,
    /// Created up front by a creator without parameters.
    Owned(BoxedValue),
    /// The caller's instance, patched in place.
    Patch(&'b mut dyn Any),
}

#[derive(Default)]
struct ExternalState {
    tag: Option<String>,
    /// Body that arrived before its discriminator.
    body: Option<Value>,
}

/// Binds the entries of one object body to a plain bean.
///
/// Entries are bound in arrival order. Creator arguments are collected until
/// the object ends; settable values are written straight away when the
/// instance already exists and buffered otherwise. [`finish`](Self::finish)
/// fills in what is missing, creates the instance and applies the buffered
/// values.
pub(super) struct BeanBinder<'b, 'a> {
    ctx: &'b mut DecodeContext<'a>,
    model: &'b BeanModel,
    constructor: Consumer<'b, PropertyModel>,
    settable: Consumer<'b, PropertyModel>,
    args: Vec<Option<BoxedValue>>,
    instance: Instance<'b>,
    /// Settable index and value, applied after creation.
    pending: Vec<(usize, BoxedValue)>,
    any: Vec<(String, BoxedValue)>,
    externals: Vec<ExternalState>,
    owner: Option<OwnerHandle>,
    /// Properties whose explicit null counts as absent.
    absent: Vec<PropertyLocation>,
    /// Unwrapped slots with at least one key on the wire.
    touched: Vec<bool>,
}

impl<'b, 'a> BeanBinder<'b, 'a> {
    /// A binder creating a new instance of `model`.
    pub fn new<E: de::Error>(
        ctx: &'b mut DecodeContext<'a>,
        model: &'b BeanModel,
        owner: Option<OwnerHandle>,
    ) -> Result<Self, E> {
        let instance = if model.arity == 0 {
            match model.instantiate(Vec::new()) {
                Ok(instance) => Instance::Owned(instance),
                Err(err) => return Err(ctx.fail(err)),
            }
        } else {
            Instance::Pending
        };
        Ok(Self::with_instance(ctx, model, owner, instance))
    }

    /// A binder writing into `target`, an existing instance of `model`.
    pub fn patch(ctx: &'b mut DecodeContext<'a>, model: &'b BeanModel, target: &'b mut dyn Any) -> Self {
        Self::with_instance(ctx, model, None, Instance::Patch(target))
    }

    fn with_instance(
        ctx: &'b mut DecodeContext<'a>,
        model: &'b BeanModel,
        owner: Option<OwnerHandle>,
        instance: Instance<'b>,
    ) -> Self {
        Self {
            ctx,
            model,
            constructor: model.constructor.consumer(),
            settable: model.settable.consumer(),
            args: (0..model.arg_len).map(|_| None).collect(),
            instance,
            pending: Vec::new(),
            any: Vec::new(),
            externals: model.externals.iter().map(|_| ExternalState::default()).collect(),
            owner,
            absent: Vec::new(),
            touched: alloc::vec![false; model.unwrapped.len()],
        }
    }

    #[inline]
    pub fn fail<E: de::Error>(&mut self, err: BindError) -> E {
        self.ctx.fail(err)
    }

    #[inline]
    fn is_patch(&self) -> bool {
        matches!(self.instance, Instance::Patch(_))
    }

    // -------------------------------------------------------------------------
    // Entries

    /// Binds the entry `key`, reading its value from `input`.
    pub fn bind_entry<'de, I: EntrySource<'de>>(&mut self, key: &str, input: I) -> Result<(), I::Error> {
        let model = self.model;
        if let Some(&index) = model.external_keys.get(key) {
            return self.bind_discriminator(index, key, input);
        }
        if let Some(index) = model.constructor.lookup(key) {
            return self.bind_property(PropertyLocation::Constructor(index), key, input);
        }
        if let Some(index) = model.settable.lookup(key) {
            return self.bind_property(PropertyLocation::Settable(index), key, input);
        }
        if model.read_only.contains(key) || model.ignored_names.contains(key) {
            log::trace!("skipped read-only or ignored key `{key}` of `{}`", model.ty);
            return input.skip();
        }
        self.bind_unknown(key, input)
    }

    fn bind_property<'de, I: EntrySource<'de>>(
        &mut self,
        location: PropertyLocation,
        key: &str,
        input: I,
    ) -> Result<(), I::Error> {
        let model = self.model;
        let Some(property) = model.property(location) else {
            return input.skip();
        };
        if property.is_ignored() || property.back_ref.is_some() {
            log::trace!("skipped key `{key}` of `{}`, it is never read", model.ty);
            return input.skip();
        }
        if !property.in_views(self.ctx.views()) {
            log::trace!("skipped key `{key}` of `{}`, its views are inactive", model.ty);
            return input.skip();
        }
        if self.is_patch()
            && property.origin == PropertyOrigin::Own
            && matches!(property.binding, PropertyBinding::Constructor(_))
            && property.writer.is_none()
        {
            return self.bind_unknown(key, input);
        }

        let fresh = match location {
            PropertyLocation::Constructor(index) => self.constructor.consume_index(index),
            PropertyLocation::Settable(index) => self.settable.consume_index(index),
            PropertyLocation::ReadOnly(_) => true,
        };
        if !fresh {
            return Err(self.fail(BindError::DuplicateProperty {
                type_name: model.ty.short_name(),
                property: property.name.clone(),
            }));
        }

        if let Some(index) = model.externals.iter().position(|e| e.location == location) {
            if self.externals[index].tag.is_none() {
                let body = self.capture(property, key, input)?;
                self.externals[index].body = Some(body);
                return Ok(());
            }
            let value = self.decode_external(index, input)?;
            return self.store(location, property, value);
        }

        match self.decode_property(property, key, input)? {
            Some(value) => self.store(location, property, value),
            None => {
                self.absent.push(location);
                Ok(())
            }
        }
    }

    /// Decodes a property value; `None` for an explicit null that counts as absent.
    fn decode_property<'de, I: EntrySource<'de>>(
        &mut self,
        property: &PropertyModel,
        key: &str,
        input: I,
    ) -> Result<Option<BoxedValue>, I::Error> {
        let meta = self.ctx.meta(property.ty).map_err(|err| self.ctx.fail(err))?;
        if let Some(label) = &property.managed_ref {
            self.ctx.resolver.push(ReferenceFrame {
                label: label.clone(),
                owner: self.owner.clone(),
                argument: property.ty,
            });
        }

        self.ctx.push_key(key);
        let result = if meta.accepts_null() && property.is_nullable() {
            input.value(TypedSeed::new(&mut *self.ctx, property.ty)).map(Some)
        } else {
            input.value(NullProbe {
                ctx: &mut *self.ctx,
                meta,
                nullable: property.is_nullable(),
            })
        };
        let result = self.ctx.leave_property(result, self.model.ty, &property.name, property.ty);

        if property.managed_ref.is_some() {
            self.ctx.resolver.pop();
        }
        result
    }

    fn capture<'de, I: EntrySource<'de>>(
        &mut self,
        property: &PropertyModel,
        key: &str,
        input: I,
    ) -> Result<Value, I::Error> {
        self.ctx.push_key(key);
        let result = input.value(PhantomData::<Value>);
        self.ctx.leave_property(result, self.model.ty, &property.name, property.ty)
    }

    fn store<E: de::Error>(
        &mut self,
        location: PropertyLocation,
        property: &PropertyModel,
        value: BoxedValue,
    ) -> Result<(), E> {
        let model = self.model;
        if let PropertyOrigin::Unwrapped { slot, .. } = property.origin
            && let Some(touched) = self.touched.get_mut(slot)
        {
            *touched = true;
        }

        let written = match (property.binding, property.origin, &mut self.instance) {
            (PropertyBinding::Constructor(_), PropertyOrigin::Own, Instance::Patch(target)) => {
                write_property(model, property, &mut **target, value)
            }
            (PropertyBinding::Constructor(index), ..) => {
                if let Some(arg) = self.args.get_mut(index) {
                    *arg = Some(value);
                }
                Ok(())
            }
            (PropertyBinding::Setter, PropertyOrigin::Own, Instance::Owned(instance)) => {
                write_property(model, property, &mut **instance, value)
            }
            (PropertyBinding::Setter, PropertyOrigin::Own, Instance::Patch(target)) => {
                write_property(model, property, &mut **target, value)
            }
            (PropertyBinding::Setter, ..) => {
                if let PropertyLocation::Settable(index) = location {
                    self.pending.push((index, value));
                }
                Ok(())
            }
        };
        written.map_err(|err| self.ctx.fail(err))
    }

    fn bind_unknown<'de, I: EntrySource<'de>>(&mut self, key: &str, input: I) -> Result<(), I::Error> {
        let model = self.model;
        if let Some(any) = &model.any_setter {
            self.ctx.push_key(key);
            let result = input.value(TypedSeed::new(&mut *self.ctx, any.value));
            let value = self.ctx.leave_property(result, model.ty, key, any.value)?;
            self.any.push((String::from(key), value));
            return Ok(());
        }
        if model.ignore_unknown {
            log::trace!("ignored unknown key `{key}` of `{}`", model.ty);
            return input.skip();
        }
        Err(self.fail(BindError::UnknownProperty {
            type_name: model.ty.short_name(),
            property: String::from(key),
        }))
    }

    // -------------------------------------------------------------------------
    // External discriminators

    fn bind_discriminator<'de, I: EntrySource<'de>>(
        &mut self,
        index: usize,
        key: &str,
        input: I,
    ) -> Result<(), I::Error> {
        let model = self.model;
        if self.externals[index].tag.is_some() {
            return Err(self.fail(BindError::DuplicateProperty {
                type_name: model.ty.short_name(),
                property: String::from(key),
            }));
        }
        self.ctx.push_key(key);
        let result = input.value(PhantomData::<String>);
        let tag = self
            .ctx
            .leave_property(result, model.ty, key, TypeRef::of::<String>())?;
        self.externals[index].tag = Some(tag);

        if let Some(body) = self.externals[index].body.take() {
            let location = model.externals[index].location;
            if let Some(property) = model.property(location) {
                let value = self.decode_external(index, Replay::<I::Error>::new(body))?;
                self.store(location, property, value)?;
            }
        }
        Ok(())
    }

    /// Decodes the body of external property `index` as the subtype its
    /// discriminator names, or the default subtype if none arrived.
    fn decode_external<'de, I: EntrySource<'de>>(
        &mut self,
        index: usize,
        input: I,
    ) -> Result<BoxedValue, I::Error> {
        let model = self.model;
        let location = model.externals[index].location;
        let Some(property) = model.property(location) else {
            return Err(self.fail(BindError::Unsupported {
                type_name: model.ty.short_name(),
                operation: "an external discriminator without its property",
            }));
        };
        let sup = self.ctx.model(property.ty).map_err(|err| self.ctx.fail(err))?;
        let Some(subtypes) = sup.subtypes() else {
            return Err(self.fail(BindError::Unsupported {
                type_name: sup.ty().short_name(),
                operation: "an external discriminator without subtypes",
            }));
        };
        let type_name = sup.ty().short_name();
        let entry = match &self.externals[index].tag {
            Some(tag) => subtypes.resolve(tag, type_name),
            None => subtypes.resolve_missing(type_name),
        }
        .map_err(|err| self.ctx.fail(err))?;

        self.ctx
            .enter(entry.model().ty())
            .map_err(|err| self.ctx.fail(err))?;
        self.ctx.push_key(&property.name);
        let result = input.value(BodySeed::new(&mut *self.ctx, entry.model(), None));
        let result = self.ctx.leave_property(result, model.ty, &property.name, property.ty);
        self.ctx.leave();

        entry.upcast(result?, type_name).map_err(|err| self.ctx.fail(err))
    }

    fn flush_externals<E: de::Error>(&mut self) -> Result<(), E> {
        let model = self.model;
        for index in 0..self.externals.len() {
            let Some(body) = self.externals[index].body.take() else {
                continue;
            };
            let location = model.externals[index].location;
            if let Some(property) = model.property(location) {
                let value = self.decode_external(index, Replay::<E>::new(body))?;
                self.store(location, property, value)?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Finalizing

    /// Ends the object and returns the bound instance.
    pub fn finish<E: de::Error>(mut self) -> Result<BoxedValue, E> {
        self.flush_externals::<E>()?;
        self.build().map_err(|err| self.ctx.fail(err))
    }

    /// Ends the object of a patch.
    pub fn finish_patch<E: de::Error>(mut self) -> Result<(), E> {
        self.flush_externals::<E>()?;
        self.apply_patch().map_err(|err| self.ctx.fail(err))
    }

    fn build(&mut self) -> Result<BoxedValue, BindError> {
        let model = self.model;
        self.fill_missing(|_| true)?;

        let mut args = core::mem::take(&mut self.args);
        if let Some(any) = &model.any_setter
            && let Some(index) = any.constructor_index()
        {
            let entries = core::mem::take(&mut self.any);
            let map = any
                .map
                .and_then(|adapter| adapter.from_entries(entries))
                .ok_or_else(|| rejected(model, "any setter"))?;
            if let Some(arg) = args.get_mut(index) {
                *arg = Some(map);
            }
        }

        let instance = match core::mem::replace(&mut self.instance, Instance::Pending) {
            Instance::Owned(instance) => Some(instance),
            _ => None,
        };
        let settables = core::mem::take(&mut self.pending);
        let mut instance = assemble(model, args, settables, instance)?;
        apply_any(model, &mut *instance, core::mem::take(&mut self.any))?;
        Ok(instance)
    }

    fn apply_patch(&mut self) -> Result<(), BindError> {
        let model = self.model;
        let touched = self.touched.clone();
        self.fill_missing(|property| match property.origin {
            PropertyOrigin::Unwrapped { slot, .. } => touched.get(slot).copied().unwrap_or(false),
            PropertyOrigin::Own => false,
        })?;

        let any = core::mem::take(&mut self.any);
        let Parts { slots, .. } = split(
            model,
            core::mem::take(&mut self.args),
            core::mem::take(&mut self.pending),
        );
        let Instance::Patch(target) = &mut self.instance else {
            return Ok(());
        };

        for ((unwrapped, (args, settables)), touched) in model.unwrapped.iter().zip(slots).zip(touched) {
            if !touched {
                continue;
            }
            let value = assemble(&unwrapped.model, args, settables, None)?;
            let Some(writer) = &unwrapped.writer else {
                return Err(BindError::Unsupported {
                    type_name: model.ty.short_name(),
                    operation: "rebuilding an unwrapped property without a setter",
                });
            };
            model.write(&**writer, &mut **target, value)?;
        }

        if !any.is_empty() && model.any_setter.as_ref().is_some_and(|a| a.constructor_index().is_some()) {
            return Err(BindError::Unsupported {
                type_name: model.ty.short_name(),
                operation: "passing unknown keys to the creator of an existing instance",
            });
        }
        apply_any(model, &mut **target, any)
    }

    /// Applies back references, defaults and natural defaults to properties
    /// that were absent, failing for required ones.
    fn fill_missing(&mut self, include: impl Fn(&PropertyModel) -> bool) -> Result<(), BindError> {
        let model = self.model;
        let mut missing: Vec<PropertyLocation> = self
            .constructor
            .not_consumed()
            .map(|(index, _)| PropertyLocation::Constructor(index))
            .chain(
                self.settable
                    .not_consumed()
                    .map(|(index, _)| PropertyLocation::Settable(index)),
            )
            .collect();
        missing.append(&mut self.absent);

        for location in missing {
            let Some(property) = model.property(location) else {
                continue;
            };
            if !include(property) {
                continue;
            }
            let value = self.missing_value(property)?;
            match (location, property.binding) {
                (_, PropertyBinding::Constructor(index)) => {
                    if let Some(arg) = self.args.get_mut(index) {
                        *arg = value;
                    }
                }
                (PropertyLocation::Settable(index), PropertyBinding::Setter) => {
                    if let Some(value) = value {
                        self.pending.push((index, value));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn missing_value(&self, property: &PropertyModel) -> Result<Option<BoxedValue>, BindError> {
        if let Some(label) = &property.back_ref
            && let Some(value) = self.ctx.resolve_back_ref(label, property.ty)?
        {
            return Ok(Some(value));
        }
        if let Some(default) = &property.default {
            return Ok(Some(default.make()));
        }
        if property.is_required() && property.in_views(self.ctx.views()) {
            return Err(BindError::MissingRequiredProperty {
                type_name: self.model.ty.short_name(),
                property: property.name.clone(),
            });
        }
        match property.binding {
            PropertyBinding::Constructor(_) => Ok(self.ctx.meta(property.ty)?.natural_default()),
            // The instance keeps the value its creator gave it.
            PropertyBinding::Setter => Ok(None),
        }
    }
}

// -----------------------------------------------------------------------------
// NullProbe

/// Decodes a property value, reporting an explicit null separately.
struct NullProbe<'c, 'a> {
    ctx: &'c mut DecodeContext<'a>,
    meta: &'a TypeMeta,
    nullable: bool,
}

impl NullProbe<'_, '_> {
    fn null(self) -> Option<BoxedValue> {
        if self.nullable {
            self.meta.null_value()
        } else {
            None
        }
    }
}

impl<'de> DeserializeSeed<'de> for NullProbe<'_, '_> {
    type Value = Option<BoxedValue>;

    #[inline]
    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_option(self)
    }
}

impl<'de> Visitor<'de> for NullProbe<'_, '_> {
    type Value = Option<BoxedValue>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a value of type {}", self.meta.ty())
    }

    #[inline]
    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(self.null())
    }

    #[inline]
    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(self.null())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        TypedSeed::new(self.ctx, self.meta.ty())
            .deserialize(deserializer)
            .map(Some)
    }
}

// -----------------------------------------------------------------------------
// Assembly

/// The arguments and settable values of one bean, split into its own and
/// those of each unwrapped slot.
struct Parts {
    args: Vec<Option<BoxedValue>>,
    settables: Vec<(usize, BoxedValue)>,
    slots: Vec<(Vec<Option<BoxedValue>>, Vec<(usize, BoxedValue)>)>,
}

fn split(model: &BeanModel, mut args: Vec<Option<BoxedValue>>, settables: Vec<(usize, BoxedValue)>) -> Parts {
    args.resize_with(model.arg_len, || None);
    let mut rest = args.split_off(model.arity.min(args.len()));

    let mut slot_args = Vec::with_capacity(model.unwrapped.len());
    for unwrapped in model.unwrapped.iter().rev() {
        let start = unwrapped.arg_offset.saturating_sub(model.arity).min(rest.len());
        slot_args.push(rest.split_off(start));
    }
    slot_args.reverse();

    let mut slots: Vec<_> = slot_args.into_iter().map(|args| (args, Vec::new())).collect();
    let mut own = Vec::new();
    for (index, value) in settables {
        match model.settable.get(index).map(|property| property.origin) {
            Some(PropertyOrigin::Unwrapped { slot, inner }) => {
                if let Some((_, values)) = slots.get_mut(slot) {
                    values.push((inner, value));
                }
            }
            _ => own.push((index, value)),
        }
    }
    Parts {
        args,
        settables: own,
        slots,
    }
}

/// Builds an instance of `model`, nested unwrapped beans first.
fn assemble(
    model: &BeanModel,
    args: Vec<Option<BoxedValue>>,
    settables: Vec<(usize, BoxedValue)>,
    instance: Option<BoxedValue>,
) -> Result<BoxedValue, BindError> {
    let Parts {
        mut args,
        settables,
        slots,
    } = split(model, args, settables);

    let mut by_setter: Vec<(&UnwrappedModel, BoxedValue)> = Vec::new();
    for (unwrapped, (slot_args, slot_settables)) in model.unwrapped.iter().zip(slots) {
        let value = assemble(&unwrapped.model, slot_args, slot_settables, None)?;
        match unwrapped.target {
            UnwrappedTarget::Constructor(index) => {
                if let Some(arg) = args.get_mut(index) {
                    *arg = Some(value);
                }
            }
            UnwrappedTarget::Setter => by_setter.push((unwrapped, value)),
        }
    }

    let mut instance = match instance {
        Some(instance) => instance,
        None => model.instantiate(args)?,
    };
    for (index, value) in settables {
        if let Some(property) = model.settable.get(index) {
            write_property(model, property, &mut *instance, value)?;
        }
    }
    for (unwrapped, value) in by_setter {
        if let Some(writer) = &unwrapped.writer {
            model.write(&**writer, &mut *instance, value)?;
        }
    }
    Ok(instance)
}

fn write_property(
    model: &BeanModel,
    property: &PropertyModel,
    target: &mut dyn Any,
    value: BoxedValue,
) -> Result<(), BindError> {
    match &property.writer {
        Some(writer) => model.write(&**writer, target, value),
        None => Err(BindError::Unsupported {
            type_name: model.ty.short_name(),
            operation: "writing a property without a setter",
        }),
    }
}

fn apply_any(model: &BeanModel, target: &mut dyn Any, any: Vec<(String, BoxedValue)>) -> Result<(), BindError> {
    let Some(setter) = &model.any_setter else {
        return Ok(());
    };
    if any.is_empty() {
        return Ok(());
    }
    match &setter.kind {
        AnySetterKind::Map(set) => {
            let map = setter
                .map
                .and_then(|adapter| adapter.from_entries(any))
                .ok_or_else(|| rejected(model, "any setter"))?;
            model.write(&**set, target, map)
        }
        AnySetterKind::Entry(set) => {
            for (key, value) in any {
                set.set(target, key, value)
                    .map_err(|_| rejected(model, "any setter"))?;
            }
            Ok(())
        }
        AnySetterKind::Constructor(_) => Ok(()),
    }
}

fn rejected(model: &BeanModel, what: &str) -> BindError {
    BindError::Instantiation {
        type_name: model.ty.short_name(),
        source: CreateError::Custom(alloc::format!("{what} rejected a value of another type")),
    }
}
