use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use bindle_utils::hash::{HashMap, HashSet};

use super::bean::{AnySetterKind, EncodeSlot, ExternalModel};
use super::{
    AnySetterModel, BeanCache, BeanModel, DelegatingModel, PropertyBinding, PropertyFlags,
    PropertyIndex, PropertyLocation, PropertyModel, PropertyOrigin, SubtypeEntry, SubtypeModel,
    UnwrappedModel, UnwrappedTarget,
};
use crate::decl::erased::{ErasedGetter, ErasedSetter};
use crate::decl::{
    AccessorDecl, AccessorKind, AnySetterDecl, AnySetterForm, BeanDecl, Include, SubtypePlacement,
    SubtypesDecl,
};
use crate::error::{BindError, IntrospectionError};
use crate::registry::{MapAdapter, TypeKind, TypeRef, TypeRegistry};

// -----------------------------------------------------------------------------
// Introspector

/// Turns bean declarations into [`BeanModel`]s and publishes them.
///
/// Nested models (unwrapped properties and subtypes) are built through the
/// same introspector, so a declaration that reaches itself is reported as
/// [`IntrospectionError::CyclicUnwrap`] instead of recursing.
pub(crate) struct Introspector<'a> {
    registry: &'a TypeRegistry,
    cache: &'a BeanCache,
    in_progress: Vec<TypeRef>,
}

enum Member {
    /// Every accessor was ignored; the keys are skipped on the wire.
    Dropped(Vec<String>),
    Property(PropertyModel),
    Unwrapped(UnwrappedModel),
}

/// The part of a property that is shared by plain and unwrapped members.
struct Resolved<'d> {
    name: String,
    ty: TypeRef,
    explicit_required: Option<bool>,
    include: Include,
    param: Option<(usize, bool)>,
    ranked: Vec<&'d AccessorDecl>,
    reader: Option<Arc<dyn ErasedGetter>>,
    writer: Option<Arc<dyn ErasedSetter>>,
}

impl Resolved<'_> {
    fn first<R>(&self, f: impl FnMut(&&AccessorDecl) -> Option<R>) -> Option<R> {
        self.ranked.iter().find_map(f)
    }
}

impl<'a> Introspector<'a> {
    pub fn new(registry: &'a TypeRegistry, cache: &'a BeanCache) -> Self {
        Self {
            registry,
            cache,
            in_progress: Vec::new(),
        }
    }

    /// Returns the cached model of `ty`, building and publishing it first if needed.
    pub fn model(&mut self, ty: TypeRef) -> Result<Arc<BeanModel>, BindError> {
        if let Some(model) = self.cache.get(ty.id()) {
            return Ok(model);
        }
        if self.in_progress.contains(&ty) {
            return Err(IntrospectionError::CyclicUnwrap {
                type_name: ty.short_name(),
            }
            .into());
        }
        let decl = match self.registry.get_ref(ty)?.kind() {
            TypeKind::Bean(decl) => Arc::clone(decl),
            _ => {
                return Err(BindError::Unsupported {
                    type_name: ty.short_name(),
                    operation: "introspection as a bean",
                });
            }
        };

        self.in_progress.push(ty);
        let built = match &decl.subtypes {
            Some(subtypes) => self.build_subtyped(&decl, subtypes),
            None => self.build_bean(&decl),
        };
        self.in_progress.pop();
        Ok(self.cache.publish(built?))
    }

    // -------------------------------------------------------------------------
    // Subtyped beans

    fn build_subtyped(
        &mut self,
        decl: &BeanDecl,
        subtypes: &SubtypesDecl,
    ) -> Result<BeanModel, BindError> {
        let type_name = decl.ty.short_name();
        let mut placement = subtypes.placement;
        if placement == SubtypePlacement::ExternalProperty {
            log::warn!(
                "external discriminator placement declared on type `{type_name}`, \
                 using an embedded property instead"
            );
            placement = SubtypePlacement::EmbeddedProperty;
        }

        let mut entries = Vec::with_capacity(subtypes.subtypes.len());
        for subtype in &subtypes.subtypes {
            let invalid = |reason| IntrospectionError::InvalidSubtype {
                type_name,
                subtype: String::from(subtype.ty.short_name()),
                reason,
            };
            let model = self.model(subtype.ty)?;
            if model.subtypes.is_some() {
                return Err(invalid("a subtype can not declare subtypes of its own").into());
            }
            if placement == SubtypePlacement::Deduction && model.is_delegating() {
                return Err(invalid("a delegating subtype can not be deduced from its properties").into());
            }
            if placement == SubtypePlacement::EmbeddedProperty {
                if model.is_delegating() {
                    return Err(invalid("a delegating subtype can not embed a discriminator").into());
                }
                if model.find(&subtypes.discriminator).is_some() {
                    return Err(invalid("a property is named like the discriminator").into());
                }
            }
            let names = if subtype.names.is_empty() {
                vec![String::from(subtype.ty.short_name())]
            } else {
                subtype.names.clone()
            };
            entries.push(SubtypeEntry {
                names,
                model,
                upcast: Arc::clone(&subtype.upcast),
                downcast: Arc::clone(&subtype.downcast),
            });
        }

        let mut subtype_model = SubtypeModel::new(subtypes.discriminator.clone(), placement, entries);
        if let Some(name) = &subtypes.default_subtype {
            let invalid = |reason| IntrospectionError::InvalidSubtype {
                type_name,
                subtype: name.clone(),
                reason,
            };
            if subtype_model.ambiguous.contains(name.as_str()) {
                return Err(invalid("the default subtype name is claimed twice").into());
            }
            let Some(&index) = subtype_model.by_name.get(name.as_str()) else {
                return Err(invalid("the default subtype is not declared").into());
            };
            subtype_model.default_subtype = Some(index);
        }

        let mut model = empty_model(decl);
        model.subtypes = Some(subtype_model);
        Ok(model)
    }

    // -------------------------------------------------------------------------
    // Plain beans

    fn build_bean(&mut self, decl: &BeanDecl) -> Result<BeanModel, BindError> {
        let type_name = decl.ty.short_name();
        let creator = match decl.creators.as_slice() {
            [] => return Err(IntrospectionError::NoCreator { type_name }.into()),
            [creator] => creator,
            _ => return Err(IntrospectionError::MultipleCreators { type_name }.into()),
        };
        let arity = creator.arity;

        let mut model = empty_model(decl);
        model.create = Some(Arc::clone(&creator.create));
        model.arity = arity;
        model.arg_len = arity;

        // A delegating creator whose argument is not a named property.
        if let Some(delegate) = &creator.delegate
            && !decl
                .accessors
                .iter()
                .any(|a| matches!(a.kind, AccessorKind::Param(0)))
        {
            model.delegating = Some(DelegatingModel {
                arg: delegate.arg,
                value_of: Arc::clone(&delegate.value_of),
            });
            return Ok(model);
        }

        let mut claimed = vec![false; arity];
        let mut constructor = Vec::new();
        let mut settable = Vec::new();
        let mut read_only = Vec::new();
        let mut externals = Vec::new();

        for (name, accessors) in group_accessors(&decl.accessors) {
            match self.member(decl, name, &accessors, arity)? {
                Member::Dropped(keys) => model.ignored_names.extend(keys),
                Member::Property(property) => {
                    let discriminator = property.external_discriminator.clone();
                    if let Some(discriminator) = &discriminator {
                        self.check_external(type_name, &property, discriminator)?;
                    }
                    let location = match property.binding {
                        PropertyBinding::Constructor(index) => {
                            claim(&mut claimed, index, &property.name, type_name)?;
                            constructor.push(property);
                            PropertyLocation::Constructor(constructor.len() - 1)
                        }
                        PropertyBinding::Setter if property.flags.contains(PropertyFlags::READ_ONLY) => {
                            read_only.push(property);
                            PropertyLocation::ReadOnly(read_only.len() - 1)
                        }
                        PropertyBinding::Setter => {
                            settable.push(property);
                            PropertyLocation::Settable(settable.len() - 1)
                        }
                    };
                    if let Some(discriminator) = discriminator {
                        externals.push(ExternalModel {
                            discriminator,
                            location,
                        });
                    }
                    model.encode.push(EncodeSlot::Property(location));
                }
                Member::Unwrapped(mut unwrapped) => {
                    if let UnwrappedTarget::Constructor(index) = unwrapped.target {
                        claim(&mut claimed, index, &unwrapped.name, type_name)?;
                    }
                    let slot = model.unwrapped.len();
                    unwrapped.arg_offset = model.arg_len;
                    model.arg_len += unwrapped.model.arg_len;
                    merge_unwrapped(
                        &unwrapped,
                        slot,
                        [&mut constructor, &mut settable, &mut read_only],
                        &mut model.ignored_names,
                    );
                    model.unwrapped.push(unwrapped);
                    model.encode.push(EncodeSlot::Unwrapped(slot));
                }
            }
        }

        model.any_setter = match decl.any_setters.as_slice() {
            [] => None,
            [any_setter] => Some(self.any_setter(any_setter, type_name, arity)?),
            _ => return Err(IntrospectionError::MultipleAnySetters { type_name }.into()),
        };
        if let Some(index) = model.any_setter.as_ref().and_then(AnySetterModel::constructor_index) {
            if claimed[index] {
                return Err(IntrospectionError::MalformedAnySetter {
                    type_name,
                    reason: "its creator parameter is already bound to a property",
                }
                .into());
            }
            claimed[index] = true;
        }
        if let Some(index) = claimed.iter().position(|bound| !bound) {
            return Err(IntrospectionError::UnboundCreatorParameter { type_name, index }.into());
        }

        let duplicate = |property: String| IntrospectionError::DuplicateProperty {
            type_name,
            property,
        };
        model.constructor = PropertyIndex::new(constructor).map_err(duplicate)?;
        model.settable = PropertyIndex::new(settable).map_err(duplicate)?;
        model.read_only = PropertyIndex::new(read_only).map_err(duplicate)?;
        for key in model.settable.keys().chain(model.read_only.keys()) {
            if model.constructor.contains(key) {
                return Err(duplicate(String::from(key)).into());
            }
        }
        for key in model.read_only.keys() {
            if model.settable.contains(key) {
                return Err(duplicate(String::from(key)).into());
            }
        }

        let mut external_keys = HashMap::default();
        for (index, external) in externals.iter().enumerate() {
            let key = external.discriminator.as_str();
            if model.find(key).is_some() || external_keys.insert(String::from(key), index).is_some() {
                return Err(duplicate(String::from(key)).into());
            }
        }
        model.externals = externals;
        model.external_keys = external_keys;

        let live: Vec<String> = model
            .ignored_names
            .iter()
            .filter(|name| model.find(name).is_some() || model.external_keys.contains_key(*name))
            .cloned()
            .collect();
        for name in live {
            model.ignored_names.remove(&name);
        }
        Ok(model)
    }

    /// Resolves one logical property from the accessors sharing its name.
    fn member(
        &mut self,
        decl: &BeanDecl,
        declared: &str,
        accessors: &[&AccessorDecl],
        arity: usize,
    ) -> Result<Member, BindError> {
        let type_name = decl.ty.short_name();
        let implicit = match decl.naming {
            Some(naming) => naming.apply(declared),
            None => String::from(declared),
        };
        let param = accessors.iter().find_map(|a| match a.kind {
            AccessorKind::Param(index) => Some((index, a.ignored)),
            _ => None,
        });

        let mut live: Vec<&AccessorDecl> = accessors.iter().copied().filter(|a| !a.ignored).collect();
        live.sort_by_key(|a| a.kind.priority());
        if live.is_empty() && param.is_none() {
            let mut keys = vec![implicit];
            for accessor in accessors {
                keys.extend(accessor.rename.iter().cloned());
                keys.extend(accessor.aliases.iter().cloned());
            }
            return Ok(Member::Dropped(keys));
        }
        let ranked = if live.is_empty() {
            let mut all = accessors.to_vec();
            all.sort_by_key(|a| a.kind.priority());
            all
        } else {
            live.clone()
        };

        let mut rename: Option<&String> = None;
        for accessor in &ranked {
            match (rename, &accessor.rename) {
                (None, Some(name)) => rename = Some(name),
                (Some(first), Some(second)) if first != second => {
                    return Err(IntrospectionError::ConflictingNames {
                        type_name,
                        property: String::from(declared),
                        first: first.clone(),
                        second: second.clone(),
                    }
                    .into());
                }
                _ => {}
            }
        }

        let Some(ty) = ranked.first().map(|a| a.ty) else {
            return Ok(Member::Dropped(Vec::new()));
        };
        if let Some(other) = accessors.iter().find(|a| a.ty != ty) {
            return Err(IntrospectionError::TypeMismatch {
                type_name,
                property: String::from(declared),
                first: ty.name(),
                second: other.ty.name(),
            }
            .into());
        }

        let reader = live.iter().find_map(|a| match &a.kind {
            AccessorKind::Getter(get) | AccessorKind::Field { get, .. } => Some(Arc::clone(get)),
            _ => None,
        });
        let writer = live.iter().find_map(|a| match &a.kind {
            AccessorKind::Setter(set) | AccessorKind::Field { set, .. } => Some(Arc::clone(set)),
            _ => None,
        });
        let resolved = Resolved {
            name: rename.cloned().unwrap_or(implicit),
            ty,
            explicit_required: ranked.iter().find_map(|a| a.required),
            include: ranked
                .iter()
                .find_map(|a| a.include)
                .or(decl.include)
                .unwrap_or_default(),
            param,
            ranked,
            reader,
            writer,
        };
        if let Some(index) = param.map(|(index, _)| index)
            && index >= arity
        {
            return Err(IntrospectionError::UnboundCreatorParameter { type_name, index }.into());
        }

        match resolved.first(|a| a.unwrapped.clone()) {
            Some((prefix, suffix)) => self.unwrapped(type_name, declared, resolved, prefix, suffix),
            None => self.property(type_name, declared, resolved).map(Member::Property),
        }
    }

    fn property(
        &self,
        type_name: &'static str,
        declared: &str,
        resolved: Resolved<'_>,
    ) -> Result<PropertyModel, BindError> {
        let meta = self.registry.get_ref(resolved.ty)?;
        let default = resolved.first(|a| a.default.clone());
        if let Some(default) = &default
            && default.ty() != resolved.ty
        {
            return Err(IntrospectionError::DefaultTypeMismatch {
                type_name,
                property: String::from(declared),
                expected: resolved.ty.name(),
                found: default.ty().name(),
            }
            .into());
        }

        let mut aliases: Vec<String> = Vec::new();
        for alias in resolved.ranked.iter().flat_map(|a| a.aliases.iter()) {
            if !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
        }

        let back_ref = resolved.first(|a| a.back_ref.clone());
        let nullable = resolved
            .first(|a| a.nullable)
            .unwrap_or_else(|| meta.accepts_null());
        let required = resolved
            .explicit_required
            .unwrap_or(!nullable && back_ref.is_none());

        let mut flags = PropertyFlags::empty();
        flags.set(PropertyFlags::NULLABLE, nullable);
        let binding = match resolved.param {
            Some((index, ignored)) => {
                flags.set(PropertyFlags::IGNORED, ignored);
                PropertyBinding::Constructor(index)
            }
            None => {
                flags.set(PropertyFlags::READ_ONLY, resolved.writer.is_none());
                PropertyBinding::Setter
            }
        };
        if required && !flags.intersects(PropertyFlags::IGNORED | PropertyFlags::READ_ONLY) {
            flags |= PropertyFlags::REQUIRED;
        }

        Ok(PropertyModel {
            aliases,
            ty: resolved.ty,
            flags,
            default,
            binding,
            origin: PropertyOrigin::Own,
            managed_ref: resolved.first(|a| a.managed_ref.clone()),
            back_ref,
            views: resolved.first(|a| a.views.clone()),
            external_discriminator: resolved.first(|a| a.external_discriminator.clone()),
            include: resolved.include,
            name: resolved.name,
            reader: resolved.reader,
            writer: resolved.writer,
        })
    }

    fn unwrapped(
        &mut self,
        type_name: &'static str,
        declared: &str,
        resolved: Resolved<'_>,
        prefix: String,
        suffix: String,
    ) -> Result<Member, BindError> {
        let invalid = |reason| IntrospectionError::InvalidUnwrapped {
            type_name,
            property: String::from(declared),
            reason,
        };
        if resolved.explicit_required == Some(true) {
            return Err(IntrospectionError::RequiredUnwrapped {
                type_name,
                property: String::from(declared),
            }
            .into());
        }
        if self.registry.get_ref(resolved.ty)?.bean_decl().is_none() {
            return Err(invalid("only bean types can be unwrapped").into());
        }

        let nested = self.model(resolved.ty)?;
        if nested.subtypes.is_some() {
            return Err(invalid("a bean with subtypes can not be unwrapped").into());
        }
        if nested.is_delegating() {
            return Err(invalid("a delegating bean can not be unwrapped").into());
        }
        if nested.any_setter.is_some() {
            return Err(invalid("a bean with an any setter can not be unwrapped").into());
        }
        if !nested.externals.is_empty() {
            return Err(invalid("a bean with external discriminators can not be unwrapped").into());
        }
        if nested.wrapper_property.is_some() {
            return Err(invalid("a bean with a wrapper property can not be unwrapped").into());
        }

        let target = match resolved.param {
            Some((index, _)) => UnwrappedTarget::Constructor(index),
            None if resolved.writer.is_some() => UnwrappedTarget::Setter,
            None => return Err(invalid("it has neither a creator parameter nor a writer").into()),
        };
        Ok(Member::Unwrapped(UnwrappedModel {
            name: String::from(declared),
            model: nested,
            prefix,
            suffix,
            arg_offset: 0,
            target,
            views: resolved.first(|a| a.views.clone()),
            reader: resolved.reader,
            writer: resolved.writer,
        }))
    }

    fn check_external(
        &self,
        type_name: &'static str,
        property: &PropertyModel,
        discriminator: &str,
    ) -> Result<(), BindError> {
        let subtyped = self
            .registry
            .get_ref(property.ty)?
            .bean_decl()
            .is_some_and(|decl| decl.subtypes.is_some());
        if subtyped && !discriminator.is_empty() {
            Ok(())
        } else {
            Err(IntrospectionError::InvalidSubtype {
                type_name,
                subtype: property.name.clone(),
                reason: "an external discriminator needs a property type with subtypes",
            }
            .into())
        }
    }

    fn any_setter(
        &self,
        decl: &AnySetterDecl,
        type_name: &'static str,
        arity: usize,
    ) -> Result<AnySetterModel, BindError> {
        let map_of = |ty: TypeRef| -> Result<MapAdapter, BindError> {
            match self.registry.get_ref(ty)?.kind() {
                TypeKind::Map(adapter) => Ok(*adapter),
                _ => Err(IntrospectionError::MalformedAnySetter {
                    type_name,
                    reason: "the collecting type is not a string keyed map",
                }
                .into()),
            }
        };

        let (value, map, kind) = match &decl.form {
            AnySetterForm::Map { map, set } => {
                let adapter = map_of(*map)?;
                (adapter.value(), Some(adapter), AnySetterKind::Map(Arc::clone(set)))
            }
            AnySetterForm::Entry { value, set } => (*value, None, AnySetterKind::Entry(Arc::clone(set))),
            AnySetterForm::Param { map, index } => {
                if *index >= arity {
                    return Err(IntrospectionError::MalformedAnySetter {
                        type_name,
                        reason: "its creator parameter is out of range",
                    }
                    .into());
                }
                let adapter = map_of(*map)?;
                (adapter.value(), Some(adapter), AnySetterKind::Constructor(*index))
            }
        };
        self.registry.get_ref(value)?;

        let getter = match &decl.getter {
            Some((ty, get)) => Some((map_of(*ty)?, Arc::clone(get))),
            None => None,
        };
        Ok(AnySetterModel {
            value,
            map,
            kind,
            getter,
        })
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn empty_model(decl: &BeanDecl) -> BeanModel {
    BeanModel {
        ty: decl.ty,
        constructor: PropertyIndex::default(),
        settable: PropertyIndex::default(),
        read_only: PropertyIndex::default(),
        unwrapped: Vec::new(),
        any_setter: None,
        create: None,
        arity: 0,
        arg_len: 0,
        delegating: None,
        ignore_unknown: decl.ignore_unknown,
        wrapper_property: decl.wrapper_property.clone(),
        subtypes: None,
        externals: Vec::new(),
        external_keys: HashMap::default(),
        ignored_names: HashSet::default(),
        encode: Vec::new(),
    }
}

/// Accessors by declared name, in order of first declaration.
fn group_accessors(accessors: &[AccessorDecl]) -> Vec<(&str, Vec<&AccessorDecl>)> {
    let mut groups: Vec<(&str, Vec<&AccessorDecl>)> = Vec::new();
    for accessor in accessors {
        match groups.iter_mut().find(|(name, _)| *name == accessor.name) {
            Some((_, group)) => group.push(accessor),
            None => groups.push((accessor.name.as_str(), vec![accessor])),
        }
    }
    groups
}

fn claim(
    claimed: &mut [bool],
    index: usize,
    property: &str,
    type_name: &'static str,
) -> Result<(), BindError> {
    match claimed.get_mut(index) {
        None => Err(IntrospectionError::UnboundCreatorParameter { type_name, index }.into()),
        Some(true) => Err(IntrospectionError::DuplicateProperty {
            type_name,
            property: String::from(property),
        }
        .into()),
        Some(slot) => {
            *slot = true;
            Ok(())
        }
    }
}

/// Copies the nested model's properties into the parent's index lists.
fn merge_unwrapped(
    unwrapped: &UnwrappedModel,
    slot: usize,
    [constructor, settable, read_only]: [&mut Vec<PropertyModel>; 3],
    ignored_names: &mut HashSet<String>,
) {
    let nested = &unwrapped.model;
    let flatten = |inner: usize, property: &PropertyModel| {
        let mut flat = property.flattened(&unwrapped.prefix, &unwrapped.suffix);
        if let PropertyBinding::Constructor(index) = flat.binding {
            flat.binding = PropertyBinding::Constructor(unwrapped.arg_offset + index);
        }
        flat.origin = PropertyOrigin::Unwrapped { slot, inner };
        if flat.views.is_none() {
            flat.views = unwrapped.views.clone();
        }
        flat
    };
    constructor.extend(nested.constructor.iter().enumerate().map(|(i, p)| flatten(i, p)));
    settable.extend(nested.settable.iter().enumerate().map(|(i, p)| flatten(i, p)));
    read_only.extend(nested.read_only.iter().enumerate().map(|(i, p)| flatten(i, p)));
    ignored_names.extend(
        nested
            .ignored_names
            .iter()
            .map(|name| alloc::format!("{}{name}{}", unwrapped.prefix, unwrapped.suffix)),
    );
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::vec::Vec;

    use crate::decl::{AccessorDecl, AnySetterDecl, BeanBuilder, Include, SubtypePlacement, SubtypesDecl};
    use crate::error::{BindError, IntrospectionError};
    use crate::model::{BeanCache, PropertyBinding, PropertyFlags, PropertyOrigin};
    use crate::registry::{GetTypeMeta, TypeMeta, TypeRef, TypeRegistry};

    fn introspect<T: GetTypeMeta>() -> Result<alloc::sync::Arc<crate::model::BeanModel>, BindError> {
        let mut registry = TypeRegistry::new();
        registry.register::<T>();
        BeanCache::new().get_or_build(&registry, TypeRef::of::<T>())
    }

    fn introspection_error<T: GetTypeMeta>() -> IntrospectionError {
        match introspect::<T>() {
            Err(BindError::Introspection(err)) => err,
            other => panic!("expected an introspection error, got {other:?}"),
        }
    }

    #[derive(Default)]
    struct Account {
        id: i32,
        owner: String,
        note: Option<String>,
        secret: String,
    }

    impl GetTypeMeta for Account {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Account>::new()
                .creator(1, |args| {
                    Ok(Account {
                        id: args.take(0)?,
                        ..Account::default()
                    })
                })
                .accessor(AccessorDecl::param::<i32>("id", 0))
                .accessor(AccessorDecl::getter("id", |a: &Account| &a.id).rename("account_id"))
                .accessor(AccessorDecl::field("owner", |a: &Account| &a.owner, |a: &mut Account| &mut a.owner).alias("holder"))
                .accessor(AccessorDecl::field("note", |a: &Account| &a.note, |a: &mut Account| &mut a.note))
                .accessor(AccessorDecl::field("secret", |a: &Account| &a.secret, |a: &mut Account| &mut a.secret).ignored())
                .build()
        }
    }

    #[test]
    fn accessors_merge_into_properties() {
        let model = introspect::<Account>().unwrap();
        assert_eq!(model.arity(), 1);

        let id = model.constructor_properties().get_by_name("account_id").unwrap();
        assert_eq!(id.binding(), PropertyBinding::Constructor(0));
        assert!(id.is_required());
        assert!(!model.settable_properties().contains("id"));

        let owner = model.settable_properties().get_by_name("holder").unwrap();
        assert_eq!(owner.name(), "owner");
        assert!(owner.is_required());

        let note = model.settable_properties().get_by_name("note").unwrap();
        assert!(note.is_nullable());
        assert!(!note.is_required());

        assert!(model.find("secret").is_none());
        assert!(model.ignored_names.contains("secret"));
    }

    struct Inner {
        x: i32,
        y: i32,
    }

    impl GetTypeMeta for Inner {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Inner>::new()
                .creator(1, |args| Ok(Inner { x: args.take(0)?, y: 0 }))
                .accessor(AccessorDecl::param::<i32>("x", 0))
                .accessor(AccessorDecl::getter("x", |i: &Inner| &i.x))
                .accessor(AccessorDecl::field("y", |i: &Inner| &i.y, |i: &mut Inner| &mut i.y))
                .build()
        }
    }

    struct Outer {
        id: i32,
        inner: Inner,
    }

    impl GetTypeMeta for Outer {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Outer>::new()
                .creator(2, |args| {
                    Ok(Outer {
                        id: args.take(0)?,
                        inner: args.take(1)?,
                    })
                })
                .accessor(AccessorDecl::param::<i32>("id", 0))
                .accessor(AccessorDecl::param::<Inner>("inner", 1).unwrapped_with("in_", ""))
                .accessor(AccessorDecl::getter("id", |o: &Outer| &o.id))
                .accessor(AccessorDecl::getter("inner", |o: &Outer| &o.inner))
                .build()
        }
    }

    #[test]
    fn unwrapped_properties_are_flattened() {
        let model = introspect::<Outer>().unwrap();
        assert_eq!(model.arity(), 2);
        assert_eq!(model.arg_len(), 3);
        assert_eq!(model.unwrapped_properties().len(), 1);
        assert_eq!(model.unwrapped_properties()[0].arg_range(), 2..3);

        let x = model.constructor_properties().get_by_name("in_x").unwrap();
        assert_eq!(x.binding(), PropertyBinding::Constructor(2));
        assert_eq!(x.origin(), PropertyOrigin::Unwrapped { slot: 0, inner: 0 });

        let y = model.settable_properties().get_by_name("in_y").unwrap();
        assert_eq!(y.origin(), PropertyOrigin::Unwrapped { slot: 0, inner: 0 });
        assert!(model.find("inner").is_none());
        assert!(model.find("x").is_none());
    }

    struct Empty;

    impl GetTypeMeta for Empty {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Empty>::new().build()
        }
    }

    struct Twice;

    impl GetTypeMeta for Twice {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Twice>::new()
                .default_constructor(|| Twice)
                .default_constructor(|| Twice)
                .build()
        }
    }

    #[test]
    fn creators_are_checked() {
        assert_eq!(
            introspection_error::<Empty>(),
            IntrospectionError::NoCreator { type_name: "Empty" }
        );
        assert_eq!(
            introspection_error::<Twice>(),
            IntrospectionError::MultipleCreators { type_name: "Twice" }
        );
    }

    struct Gap(i32);

    impl GetTypeMeta for Gap {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Gap>::new()
                .creator(2, |args| Ok(Gap(args.take(0)?)))
                .accessor(AccessorDecl::param::<i32>("a", 0))
                .build()
        }
    }

    #[test]
    fn every_creator_parameter_is_bound() {
        assert_eq!(
            introspection_error::<Gap>(),
            IntrospectionError::UnboundCreatorParameter { type_name: "Gap", index: 1 }
        );
    }

    #[derive(Default)]
    struct Names {
        a: i32,
    }

    impl GetTypeMeta for Names {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Names>::new()
                .default_constructor(Names::default)
                .accessor(AccessorDecl::field("a", |n: &Names| &n.a, |n: &mut Names| &mut n.a).rename("left"))
                .accessor(AccessorDecl::getter("a", |n: &Names| &n.a).rename("right"))
                .build()
        }
    }

    #[derive(Default)]
    struct Mixed {
        a: i32,
    }

    impl GetTypeMeta for Mixed {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Mixed>::new()
                .default_constructor(Mixed::default)
                .accessor(AccessorDecl::field("a", |m: &Mixed| &m.a, |m: &mut Mixed| &mut m.a))
                .accessor(AccessorDecl::setter("a", |m: &mut Mixed, v: String| m.a = v.len() as i32))
                .build()
        }
    }

    #[derive(Default)]
    struct BadDefault {
        a: i32,
    }

    impl GetTypeMeta for BadDefault {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<BadDefault>::new()
                .default_constructor(BadDefault::default)
                .accessor(
                    AccessorDecl::field("a", |b: &BadDefault| &b.a, |b: &mut BadDefault| &mut b.a)
                        .default_value(String::from("zero")),
                )
                .build()
        }
    }

    #[derive(Default)]
    struct Clash {
        a: i32,
        b: i32,
    }

    impl GetTypeMeta for Clash {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Clash>::new()
                .default_constructor(Clash::default)
                .accessor(AccessorDecl::field("a", |c: &Clash| &c.a, |c: &mut Clash| &mut c.a))
                .accessor(AccessorDecl::field("b", |c: &Clash| &c.b, |c: &mut Clash| &mut c.b).alias("a"))
                .build()
        }
    }

    #[test]
    fn property_declarations_are_checked() {
        assert!(matches!(
            introspection_error::<Names>(),
            IntrospectionError::ConflictingNames { first, second, .. } if first == "right" && second == "left"
        ));
        assert!(matches!(
            introspection_error::<Mixed>(),
            IntrospectionError::TypeMismatch { property, .. } if property == "a"
        ));
        assert!(matches!(
            introspection_error::<BadDefault>(),
            IntrospectionError::DefaultTypeMismatch { expected: "i32", .. }
        ));
        assert_eq!(
            introspection_error::<Clash>(),
            IntrospectionError::DuplicateProperty {
                type_name: "Clash",
                property: String::from("a"),
            }
        );
    }

    struct Left;
    struct Right;

    impl GetTypeMeta for Left {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Left>::new()
                .default_constructor(|| Left)
                .accessor(AccessorDecl::setter("right", |_: &mut Left, _: Right| {}).unwrapped())
                .build()
        }
    }

    impl GetTypeMeta for Right {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Right>::new()
                .default_constructor(|| Right)
                .accessor(AccessorDecl::setter("left", |_: &mut Right, _: Left| {}).unwrapped())
                .build()
        }
    }

    #[derive(Default)]
    struct FlatLeaf {
        n: i32,
    }

    impl GetTypeMeta for FlatLeaf {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<FlatLeaf>::new()
                .default_constructor(FlatLeaf::default)
                .accessor(AccessorDecl::field("n", |f: &FlatLeaf| &f.n, |f: &mut FlatLeaf| &mut f.n).unwrapped())
                .build()
        }
    }

    struct RequiredFlat;

    impl GetTypeMeta for RequiredFlat {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<RequiredFlat>::new()
                .default_constructor(|| RequiredFlat)
                .accessor(AccessorDecl::setter("inner", |_: &mut RequiredFlat, _: Inner| {}).unwrapped().required(true))
                .build()
        }
    }

    #[test]
    fn unwrapped_declarations_are_checked() {
        assert!(matches!(
            introspection_error::<Left>(),
            IntrospectionError::CyclicUnwrap { type_name: "Left" }
        ));
        assert!(matches!(
            introspection_error::<FlatLeaf>(),
            IntrospectionError::InvalidUnwrapped { property, .. } if property == "n"
        ));
        assert!(matches!(
            introspection_error::<RequiredFlat>(),
            IntrospectionError::RequiredUnwrapped { .. }
        ));
    }

    #[derive(Default)]
    struct Extras {
        extra: BTreeMap<String, String>,
    }

    struct TwoAny;

    impl GetTypeMeta for TwoAny {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<TwoAny>::new()
                .default_constructor(|| TwoAny)
                .any_setter(AnySetterDecl::entry(|_: &mut TwoAny, _: String, _: String| {}))
                .any_setter(AnySetterDecl::entry(|_: &mut TwoAny, _: String, _: i32| {}))
                .build()
        }
    }

    struct ListAny;

    impl GetTypeMeta for ListAny {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<ListAny>::new()
                .default_constructor(|| ListAny)
                .any_setter(AnySetterDecl::map(|_: &mut ListAny, _: Vec<String>| {}))
                .build()
        }
    }

    impl GetTypeMeta for Extras {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Extras>::new()
                .default_constructor(Extras::default)
                .any_setter(
                    AnySetterDecl::entry(|e: &mut Extras, k: String, v: String| {
                        e.extra.insert(k, v);
                    })
                    .getter(|e: &Extras| &e.extra),
                )
                .build()
        }
    }

    #[test]
    fn any_setters_are_checked() {
        assert_eq!(
            introspection_error::<TwoAny>(),
            IntrospectionError::MultipleAnySetters { type_name: "TwoAny" }
        );
        assert!(matches!(
            introspection_error::<ListAny>(),
            IntrospectionError::MalformedAnySetter { .. }
        ));
        let model = introspect::<Extras>().unwrap();
        let any = model.any_setter().unwrap();
        assert!(any.value_type().is::<String>());
        assert_eq!(any.constructor_index(), None);
    }

    #[derive(Default)]
    struct Circle {
        radius: i32,
    }

    impl GetTypeMeta for Circle {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Circle>::new()
                .default_constructor(Circle::default)
                .accessor(AccessorDecl::field("radius", |c: &Circle| &c.radius, |c: &mut Circle| &mut c.radius))
                .build()
        }
    }

    enum Shape {
        Circle(Circle),
    }

    impl GetTypeMeta for Shape {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Shape>::new()
                .subtypes(
                    SubtypesDecl::new(SubtypePlacement::ExternalProperty)
                        .subtype(&[], Shape::Circle, |s| match s {
                            Shape::Circle(c) => Some(c),
                        })
                        .default_subtype("Circle"),
                )
                .build()
        }
    }

    enum Lost {
        Circle(Circle),
    }

    impl GetTypeMeta for Lost {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Lost>::new()
                .subtypes(
                    SubtypesDecl::new(SubtypePlacement::WrapperObject)
                        .subtype(&["circle"], Lost::Circle, |s| match s {
                            Lost::Circle(c) => Some(c),
                        })
                        .default_subtype("square"),
                )
                .build()
        }
    }

    #[test]
    fn subtypes_are_resolved() {
        let model = introspect::<Shape>().unwrap();
        let subtypes = model.subtypes().unwrap();
        assert_eq!(subtypes.placement(), SubtypePlacement::EmbeddedProperty);
        assert_eq!(subtypes.discriminator(), crate::decl::DEFAULT_DISCRIMINATOR);
        assert_eq!(subtypes.entries()[0].name(), "Circle");
        assert_eq!(subtypes.resolve("nope", "Shape").unwrap().name(), "Circle");
        assert!(model.constructor_properties().is_empty());

        assert!(matches!(
            introspection_error::<Lost>(),
            IntrospectionError::InvalidSubtype { subtype, .. } if subtype == "square"
        ));
    }

    struct Meters(f64);

    impl GetTypeMeta for Meters {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Meters>::new()
                .delegating(Meters, |m: &Meters| &m.0)
                .build()
        }
    }

    enum Length {
        Meters(Meters),
    }

    impl GetTypeMeta for Length {
        fn get_type_meta() -> TypeMeta {
            BeanBuilder::<Length>::new()
                .subtypes(SubtypesDecl::new(SubtypePlacement::Deduction).subtype(
                    &["meters"],
                    Length::Meters,
                    |s| match s {
                        Length::Meters(m) => Some(m),
                    },
                ))
                .build()
        }
    }

    #[test]
    fn deduced_subtypes_need_properties() {
        assert!(matches!(
            introspection_error::<Length>(),
            IntrospectionError::InvalidSubtype { type_name: "Length", subtype, .. } if subtype == "Meters"
        ));
    }

    #[test]
    fn include_policy_resolves_per_property() {
        let model = introspect::<crate::fixtures::Contact>().unwrap();
        let include = |name: &str| model.find(name).map(|(_, property)| property.include());
        assert_eq!(include("phone"), Some(Include::Always));
        assert_eq!(include("fax"), Some(Include::NonNull));
        assert_eq!(include("nick"), Some(Include::NonEmpty));

        let plain = introspect::<Circle>().unwrap();
        assert_eq!(plain.find("radius").map(|(_, p)| p.include()), Some(Include::NonEmpty));
    }

    #[test]
    fn flags_follow_binding() {
        let model = introspect::<Account>().unwrap();
        let id = model.constructor_properties().get_by_name("account_id").unwrap();
        assert!(id.flags().contains(PropertyFlags::REQUIRED));
        assert!(!id.flags().contains(PropertyFlags::READ_ONLY));
    }
}
