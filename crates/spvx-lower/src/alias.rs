//! Private, workgroup, and function variables, including the ones that
//! alias structured or byte-address buffers.
//!
//! A local of buffer type holds a pointer to the buffer it was assigned
//! from, so its IR type is a pointer and the module must be legalized
//! before it is valid for the target. Locals that reach buffers with hidden
//! counters also get one counter pointer per such buffer; see
//! [`counter`](crate::counter).

use spvx_ast::{DeclId, ParamDecl, SourceLocation, SourceType, VarDecl, VarStorage};
use spvx_ir::{Handle, StorageClass, Type, TypeInner, VarDecoration, Variable};

use crate::binder::Binder;
use crate::counter::{CounterCopy, CounterEntry, CounterVarFields, IndexPath};
use crate::layout::LayoutRule;
use crate::{CounterError, LowerError};

impl Binder {
    /// Translates the type of a variable that may alias a buffer. The flag
    /// is true when it does, in which case legalization becomes required.
    pub fn type_for_potential_alias_var(&mut self, ty: &SourceType) -> Result<(Handle<Type>, bool), LowerError> {
        let handle = self.types.translate(ty, LayoutRule::Void)?;
        let alias = ty.contains_aliasable_buffer();
        if alias {
            log::debug!("{ty} aliases a buffer; legalization required");
            self.needs_legalization = true;
        }
        Ok((handle, alias))
    }

    /// Creates a `static` or `groupshared` global.
    pub fn create_file_var(&mut self, decl: &VarDecl) -> Result<Handle<Variable>, LowerError> {
        let class = match decl.storage {
            VarStorage::Static => StorageClass::Private,
            VarStorage::GroupShared => StorageClass::Workgroup,
            VarStorage::Extern | VarStorage::Local => {
                self.types.diags.error(
                    format!("'{}' is not a static or groupshared variable", decl.name),
                    decl.loc,
                );
                return Err(LowerError::Invalid);
            }
        };
        self.create_aliasable_var(decl.id, &decl.name, &decl.ty, class, decl.loc)
    }

    /// Creates a function-local variable.
    pub fn create_fn_var(&mut self, decl: &VarDecl) -> Result<Handle<Variable>, LowerError> {
        self.create_aliasable_var(decl.id, &decl.name, &decl.ty, StorageClass::Function, decl.loc)
    }

    /// Creates the variable backing a function parameter.
    pub fn create_fn_param(&mut self, param: &ParamDecl) -> Result<Handle<Variable>, LowerError> {
        self.create_aliasable_var(param.id, &param.name, &param.ty, StorageClass::Function, param.loc)
    }

    fn create_aliasable_var(
        &mut self,
        id: DeclId,
        name: &str,
        ty: &SourceType,
        class: StorageClass,
        loc: SourceLocation,
    ) -> Result<Handle<Variable>, LowerError> {
        self.types.set_location(loc);
        let (handle, alias) = self.type_for_potential_alias_var(ty)?;
        let mut var = Variable::new(name, handle, class);
        if self.types.is_relaxed_precision(ty) {
            var.decorations.push(VarDecoration::RelaxedPrecision);
        }
        let var = self.types.module.add_variable(var);
        self.decl_vars.insert(id, var);

        if alias {
            let mut fields = CounterVarFields::new();
            self.collect_counters(name, ty, IndexPath::root(), class, &mut fields);
            if !fields.is_empty() {
                log::debug!("'{name}' carries {} counter(s)", fields.len());
                self.counters.insert(id, fields);
            }
        }
        Ok(var)
    }

    /// Creates an aliasing counter for every counter buffer reachable from
    /// `ty`. A base struct is field 0 and shifts the declared fields by one.
    fn collect_counters(
        &mut self,
        name: &str,
        ty: &SourceType,
        path: IndexPath,
        class: StorageClass,
        fields: &mut CounterVarFields,
    ) {
        match ty.desugar().0 {
            SourceType::Resource { kind, .. } if kind.has_counter() => {
                let counter = self.types.counter_type();
                let pointer = self.types.module.plain_type(TypeInner::Pointer {
                    base: counter,
                    class: StorageClass::Uniform,
                });
                let counter = self.types.module.add_variable(Variable::new(
                    format!("counter.var.{name}"),
                    pointer,
                    class,
                ));
                fields.insert(CounterEntry {
                    path,
                    counter,
                    is_alias: true,
                });
            }
            SourceType::Struct(decl) => {
                let first = u32::from(decl.base.is_some());
                if let Some(base) = &decl.base {
                    self.collect_counters(name, base, path.child(0), class, fields);
                }
                for (i, field) in decl.fields.iter().enumerate() {
                    self.collect_counters(
                        &format!("{name}.{}", field.name),
                        &field.ty,
                        path.child(first + i as u32),
                        class,
                        fields,
                    );
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Counter queries
// ---------------------------------------------------------------------------

impl Binder {
    /// The counter of the buffer at `path` inside `decl`.
    pub fn counter_pair(&self, decl: DeclId, path: &IndexPath) -> Option<&CounterEntry> {
        self.counters.get(&decl)?.get(path)
    }

    pub fn counter_fields(&self, decl: DeclId) -> Option<&CounterVarFields> {
        self.counters.get(&decl)
    }

    /// Plans the counter pointer stores for `dst = src`.
    pub fn assign_counters(&self, dst: DeclId, src: DeclId) -> Result<Vec<CounterCopy>, LowerError> {
        self.assign_counters_at(dst, &IndexPath::root(), src, &IndexPath::root())
    }

    /// Plans the counter pointer stores for assigning the member of `src`
    /// at `src_path` to the member of `dst` at `dst_path`.
    pub fn assign_counters_at(
        &self,
        dst: DeclId,
        dst_path: &IndexPath,
        src: DeclId,
        src_path: &IndexPath,
    ) -> Result<Vec<CounterCopy>, LowerError> {
        let dst = self.counters.get(&dst).ok_or(CounterError::NoCounters)?;
        let src = self.counters.get(&src).ok_or(CounterError::NoCounters)?;
        Ok(dst.assign_from(dst_path, src, src_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvx_ast::{DeclAttrs, FieldDecl, ResourceKind, ScalarType, ShaderStage, StructDecl};

    use crate::LowerOptions;

    fn binder() -> Binder {
        Binder::new(ShaderStage::Compute, LowerOptions::default())
    }

    fn append() -> SourceType {
        SourceType::resource(
            ResourceKind::AppendStructuredBuffer,
            Some(SourceType::vector(ScalarType::FLOAT, 4)),
        )
    }

    fn field(name: &str, ty: SourceType) -> FieldDecl {
        FieldDecl::new(name, ty, DeclAttrs::default())
    }

    #[test]
    fn plain_local_is_not_an_alias() {
        let mut b = binder();
        let v = VarDecl::new(1, "x", SourceType::scalar(ScalarType::FLOAT), VarStorage::Local);
        let var = b.create_fn_var(&v).unwrap();
        assert_eq!(b.module().variables[var].class, StorageClass::Function);
        assert!(!b.needs_legalization());
        assert!(b.counter_fields(DeclId(1)).is_none());
    }

    #[test]
    fn buffer_local_is_a_pointer() {
        let mut b = binder();
        let v = VarDecl::new(1, "buf", append(), VarStorage::Local);
        let var = b.create_fn_var(&v).unwrap();
        let module = b.module();
        assert!(matches!(
            module.types[module.variables[var].ty].inner,
            TypeInner::Pointer {
                class: StorageClass::Uniform,
                ..
            }
        ));
        assert!(b.needs_legalization());
        let entry = b.counter_pair(DeclId(1), &IndexPath::root()).unwrap();
        assert!(entry.is_alias);
        assert_eq!(
            module.variables[entry.counter].name.as_deref(),
            Some("counter.var.buf")
        );
    }

    #[test]
    fn byte_address_alias_has_no_counter() {
        let mut b = binder();
        let ty = SourceType::resource(ResourceKind::ByteAddressBuffer { rw: true }, None);
        let v = VarDecl::new(1, "raw", ty, VarStorage::Static);
        let var = b.create_file_var(&v).unwrap();
        assert_eq!(b.module().variables[var].class, StorageClass::Private);
        assert!(b.needs_legalization());
        assert!(b.counter_fields(DeclId(1)).is_none());
    }

    #[test]
    fn base_struct_shifts_field_paths() {
        let mut b = binder();
        let base = SourceType::structure(StructDecl {
            name: "Base".into(),
            base: None,
            fields: vec![field("first", append())],
        });
        let derived = SourceType::structure(StructDecl {
            name: "Derived".into(),
            base: Some(base),
            fields: vec![
                field("n", SourceType::scalar(ScalarType::UINT)),
                field("second", append()),
            ],
        });
        let v = VarDecl::new(1, "s", derived, VarStorage::GroupShared);
        b.create_file_var(&v).unwrap();
        let fields = b.counter_fields(DeclId(1)).unwrap();
        let paths: Vec<_> = fields.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![IndexPath::from(vec![0, 0]), IndexPath::from(vec![2])]);
        let second = fields.get(&IndexPath::from(vec![2])).unwrap();
        assert_eq!(
            b.module().variables[second.counter].name.as_deref(),
            Some("counter.var.s.second")
        );
    }

    #[test]
    fn extern_is_not_a_file_var() {
        let mut b = binder();
        let v = VarDecl::new(1, "g", SourceType::scalar(ScalarType::FLOAT), VarStorage::Extern);
        assert!(matches!(b.create_file_var(&v), Err(LowerError::Invalid)));
    }

    #[test]
    fn param_aliases_extern_buffer() {
        let mut b = binder();
        let global = VarDecl::new(1, "out", append(), VarStorage::Extern);
        b.create_extern_var(&global).unwrap();
        let param = spvx_ast::ParamDecl::new(2, "dst", append(), DeclAttrs::default());
        b.create_fn_param(&param).unwrap();

        let copies = b.assign_counters(DeclId(2), DeclId(1)).unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].src, b.counter_pair(DeclId(1), &IndexPath::root()).unwrap().counter);
        assert_eq!(copies[0].dst, b.counter_pair(DeclId(2), &IndexPath::root()).unwrap().counter);

        // The global's counter is not an alias and cannot be rebound.
        assert!(matches!(
            b.assign_counters(DeclId(1), DeclId(2)),
            Err(LowerError::Counter(CounterError::NotAlias(_)))
        ));
        assert!(matches!(
            b.assign_counters(DeclId(3), DeclId(2)),
            Err(LowerError::Counter(CounterError::NoCounters))
        ));
    }
}
