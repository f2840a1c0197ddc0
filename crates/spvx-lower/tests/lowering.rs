//! Integration tests: lower whole declarations and entry points and check
//! the resulting module.

use spvx_ast::*;
use spvx_ir::{BuiltIn, Decoration, StorageClass, TypeInner, VarDecoration, dump_module};
use spvx_lower::*;

fn float(count: u32) -> SourceType {
    SourceType::vector(ScalarType::FLOAT, count)
}

fn field(name: &str, ty: SourceType, semantic: &str) -> FieldDecl {
    let attrs = if semantic.is_empty() {
        DeclAttrs::default()
    } else {
        DeclAttrs::with_semantic(semantic)
    };
    FieldDecl::new(name, ty, attrs)
}

fn structure(name: &str, fields: Vec<FieldDecl>) -> SourceType {
    SourceType::structure(StructDecl {
        name: name.into(),
        base: None,
        fields,
    })
}

fn append() -> SourceType {
    SourceType::resource(ResourceKind::AppendStructuredBuffer, Some(float(4)))
}

fn opts() -> LowerOptions {
    LowerOptions::default()
}

// ---- Type & layout translation ----

#[test]
fn layout_is_a_pure_function() {
    let ty = structure(
        "Light",
        vec![
            field("pos", float(3), ""),
            field("range", SourceType::scalar(ScalarType::FLOAT), ""),
            field("m", SourceType::matrix(ScalarType::FLOAT, 3, 3), ""),
        ],
    );
    for rule in [
        LayoutRule::GlslStd140,
        LayoutRule::RelaxedGlslStd430,
        LayoutRule::FxcCtBuffer,
        LayoutRule::Scalar,
    ] {
        assert_eq!(layout::layout(&ty, rule, &opts()), layout::layout(&ty, rule, &opts()));
    }

    let build = || {
        let mut t = TypeTranslator::new(opts());
        t.translate(&ty, LayoutRule::GlslStd140).unwrap();
        dump_module(t.module())
    };
    assert_eq!(build(), build());
}

#[test]
fn std140_pads_to_sixteen() {
    let small = structure("S", vec![field("a", SourceType::scalar(ScalarType::FLOAT), "")]);
    let arr = SourceType::array(SourceType::scalar(ScalarType::FLOAT), 3);
    for ty in [&small, &arr] {
        let std140 = layout::layout(ty, LayoutRule::GlslStd140, &opts());
        assert_eq!(std140.size % 16, 0, "{ty} under std140");
        assert_eq!(std140.alignment % 16, 0, "{ty} under std140");
    }
    assert_eq!(layout::layout(&small, LayoutRule::GlslStd430, &opts()).size, 4);
    assert_eq!(layout::layout(&arr, LayoutRule::GlslStd430, &opts()).stride, 4);
    assert_eq!(layout::layout(&arr, LayoutRule::Scalar, &opts()).size, 12);
}

#[test]
fn struct_offsets_never_overlap() {
    let ty = structure(
        "Mixed",
        vec![
            field("a", float(3), ""),
            field("b", SourceType::scalar(ScalarType::FLOAT), ""),
            field("c", float(2), ""),
            field("d", SourceType::array(float(3), 2), ""),
            field("e", SourceType::matrix(ScalarType::FLOAT, 2, 2), ""),
            field("f", SourceType::scalar(ScalarType::DOUBLE), ""),
        ],
    );
    let decl = ty.as_struct().unwrap().clone();
    for rule in [
        LayoutRule::GlslStd140,
        LayoutRule::GlslStd430,
        LayoutRule::RelaxedGlslStd140,
        LayoutRule::RelaxedGlslStd430,
        LayoutRule::FxcCtBuffer,
        LayoutRule::FxcSBuffer,
        LayoutRule::Scalar,
    ] {
        let mut t = TypeTranslator::new(opts());
        let handle = t.translate(&ty, rule).unwrap();
        let entry = &t.module().types[handle];
        let mut end = 0;
        for (i, f) in decl.fields.iter().enumerate() {
            let offset = entry.member_offset(i as u32).unwrap();
            assert!(offset >= end, "{rule}: '{}' at {offset} overlaps end {end}", f.name);
            end = offset + layout::layout(&f.ty, rule, &opts()).size;
        }
        assert!(!t.diagnostics().has_errors());
    }
}

#[test]
fn vk_offset_overlap_is_reported() {
    let mut attrs = DeclAttrs::default();
    attrs.offset = Some(4);
    let ty = structure(
        "Bad",
        vec![field("a", float(4), ""), FieldDecl::new("b", SourceType::scalar(ScalarType::FLOAT), attrs)],
    );
    let mut t = TypeTranslator::new(opts());
    t.translate(&ty, LayoutRule::GlslStd430).unwrap();
    let errors = t.diagnostics().messages(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("vk::offset caused overlap"));
}

#[test]
fn row_major_member_is_col_major_in_ir() {
    let m = SourceType::oriented(Majorness::RowMajor, SourceType::matrix(ScalarType::FLOAT, 2, 3));
    let ty = structure("M", vec![field("m", m, "")]);
    let mut t = TypeTranslator::new(opts());
    let handle = t.translate(&ty, LayoutRule::RelaxedGlslStd140).unwrap();
    let decorations = &t.module().types[handle].decorations;
    assert!(decorations.contains(&Decoration::ColMajor { member: 0 }));
    assert!(decorations.contains(&Decoration::MatrixStride { member: 0, stride: 16 }));
    assert!(!decorations.contains(&Decoration::RowMajor { member: 0 }));
}

#[test]
fn identical_types_share_a_handle() {
    let mut t = TypeTranslator::new(opts());
    let a = t.translate(&float(4), LayoutRule::Void).unwrap();
    let b = t
        .translate(&SourceType::alias("color_t", float(4)), LayoutRule::Void)
        .unwrap();
    assert_eq!(a, b);

    let arr = SourceType::array(float(2), 4);
    let x = t.translate(&arr, LayoutRule::GlslStd430).unwrap();
    let y = t.translate(&arr.clone(), LayoutRule::GlslStd430).unwrap();
    let z = t.translate(&arr, LayoutRule::Void).unwrap();
    assert_eq!(x, y);
    assert_ne!(x, z);
}

// ---- Entry points ----

#[test]
fn clip_distances_are_packed_by_index() {
    let out = structure(
        "VSOut",
        vec![
            field("pos", float(4), "SV_Position"),
            field("a", float(2), "SV_ClipDistance2"),
            field("b", SourceType::scalar(ScalarType::FLOAT), "SV_ClipDistance0"),
            field("c", float(3), "SV_ClipDistance1"),
        ],
    );
    let mut function = FunctionDecl::new(0, "main");
    function.return_ty = out;
    let entry = EntryPointDecl::new(ShaderStage::Vertex, function);

    let mut binder = Binder::new(ShaderStage::Vertex, opts());
    assert!(binder.lower_entry_point(&entry).unwrap());

    let packer = binder.clip_cull();
    assert_eq!(packer.total(Direction::Output, ClipCullKind::Clip), 6);
    assert_eq!(packer.range(Direction::Output, ClipCullKind::Clip, 0), Some(0..1));
    assert_eq!(packer.range(Direction::Output, ClipCullKind::Clip, 1), Some(1..4));
    assert_eq!(packer.range(Direction::Output, ClipCullKind::Clip, 2), Some(4..6));

    let access = packer
        .access(Direction::Output, ClipCullKind::Clip, 2, None)
        .unwrap();
    assert_eq!((access.offset, access.count), (4, 2));
    let module = binder.module();
    let var = &module.variables[access.var];
    assert_eq!(var.builtin(), Some(BuiltIn::ClipDistance));
    assert_eq!(module.array_len(var.ty), Some(6));

    // Only the position gets its own variable.
    assert_eq!(binder.stage_vars().len(), 1);
}

#[test]
fn duplicate_explicit_location() {
    let mut a = DeclAttrs::with_semantic("A");
    a.location = Some(0);
    let mut b = DeclAttrs::with_semantic("B");
    b.location = Some(0);
    let mut function = FunctionDecl::new(0, "main");
    function.params = vec![
        ParamDecl::new(1, "a", float(4), a),
        ParamDecl::new(2, "b", float(4), b),
    ];
    let entry = EntryPointDecl::new(ShaderStage::Vertex, function);

    let mut binder = Binder::new(ShaderStage::Vertex, opts());
    assert!(!binder.lower_entry_point(&entry).unwrap());
    assert_eq!(
        binder.diagnostics().messages(Severity::Error),
        vec!["location #0 already assigned"]
    );
}

#[test]
fn pixel_shader_targets() {
    let mut function = FunctionDecl::new(0, "main");
    function.params = vec![
        ParamDecl::new(1, "pos", float(4), DeclAttrs::with_semantic("SV_Position")),
        ParamDecl::new(2, "uv", float(2), DeclAttrs::with_semantic("TEXCOORD0")),
        ParamDecl::new(3, "extra", float(4), DeclAttrs::with_semantic("SV_Target1")).output(),
    ];
    function.return_ty = float(4);
    function.return_attrs = DeclAttrs::with_semantic("SV_Target0");
    let entry = EntryPointDecl::new(ShaderStage::Pixel, function);

    let mut binder = Binder::new(ShaderStage::Pixel, opts());
    assert!(binder.lower_entry_point(&entry).unwrap());
    let lowered = binder.finish();
    let module = &lowered.module;

    let by_name = |name: &str| {
        module
            .variables
            .iter()
            .map(|(_, v)| v)
            .find(|v| v.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("no variable {name}"))
    };
    assert_eq!(by_name("gl_FragCoord").builtin(), Some(BuiltIn::FragCoord));
    assert_eq!(by_name("in.var.TEXCOORD0").location(), Some(0));
    assert_eq!(by_name("out.var.SV_Target0").location(), Some(0));
    assert_eq!(by_name("out.var.SV_Target1").location(), Some(1));
    assert!(!lowered.diagnostics.has_errors());
    assert!(!lowered.needs_legalization);
}

#[test]
fn hull_shader_interface() {
    let cp = structure(
        "ControlPoint",
        vec![field("pos", float(3), "POS"), field("id", SourceType::scalar(ScalarType::UINT), "ID")],
    );
    let patch = SourceType::resource(ResourceKind::InputPatch { count: 4 }, Some(cp.clone()));

    let mut main = FunctionDecl::new(0, "main");
    main.params = vec![
        ParamDecl::new(1, "patch", patch.clone(), DeclAttrs::default()),
        ParamDecl::new(2, "i", SourceType::scalar(ScalarType::UINT), DeclAttrs::with_semantic("SV_OutputControlPointID")),
    ];
    main.return_ty = cp;

    let mut pc = FunctionDecl::new(3, "patch_constants");
    pc.params = vec![ParamDecl::new(4, "patch", patch, DeclAttrs::default())];
    pc.return_ty = structure(
        "Factors",
        vec![
            field("edges", SourceType::array(SourceType::scalar(ScalarType::FLOAT), 4), "SV_TessFactor"),
            field("inside", SourceType::array(SourceType::scalar(ScalarType::FLOAT), 2), "SV_InsideTessFactor"),
        ],
    );

    let mut entry = EntryPointDecl::new(ShaderStage::Hull, main);
    entry.patch_constant = Some(pc);
    entry.output_control_points = Some(4);

    let mut binder = Binder::new(ShaderStage::Hull, opts());
    assert!(binder.lower_entry_point(&entry).unwrap());
    let module = binder.module();

    let vars = binder.stage_vars();
    let input_pos = vars
        .iter()
        .find(|v| v.direction == Direction::Input && v.sig_point == SigPoint::HSCPIn)
        .unwrap();
    assert_eq!(module.array_len(module.variables[input_pos.var].ty), Some(4));

    let output_pos = vars.iter().find(|v| v.sig_point == SigPoint::HSCPOut).unwrap();
    assert_eq!(module.array_len(module.variables[output_pos.var].ty), Some(4));

    let outer = vars
        .iter()
        .find(|v| v.builtin == Some(BuiltIn::TessLevelOuter))
        .unwrap();
    let outer = &module.variables[outer.var];
    assert!(outer.has_decoration(VarDecoration::Patch));
    assert_eq!(outer.class, StorageClass::Output);

    let invocation = vars
        .iter()
        .find(|v| v.builtin == Some(BuiltIn::InvocationId))
        .unwrap();
    assert_eq!(invocation.sig_point, SigPoint::HSIn);
}

#[test]
fn hull_shader_needs_control_point_count() {
    let mut main = FunctionDecl::new(0, "main");
    main.return_ty = structure("CP", vec![field("pos", float(3), "POS")]);
    let entry = EntryPointDecl::new(ShaderStage::Hull, main);
    let mut binder = Binder::new(ShaderStage::Hull, opts());
    assert!(!binder.lower_entry_point(&entry).unwrap());
}

#[test]
fn geometry_shader_interface() {
    let vertex = structure(
        "V",
        vec![field("pos", float(4), "SV_Position"), field("color", float(4), "COLOR")],
    );
    let mut verts = ParamDecl::new(1, "verts", SourceType::array(vertex.clone(), 3), DeclAttrs::default());
    verts.primitive = Some(InputPrimitive::Triangle);
    let mut stream = ParamDecl::new(
        2,
        "stream",
        SourceType::resource(
            ResourceKind::Stream {
                primitive: StreamPrimitive::Triangle,
            },
            Some(vertex),
        ),
        DeclAttrs::default(),
    );
    stream.direction = ParamDirection::InOut;

    let mut main = FunctionDecl::new(0, "main");
    main.params = vec![verts, stream];
    let entry = EntryPointDecl::new(ShaderStage::Geometry, main);

    let mut binder = Binder::new(ShaderStage::Geometry, opts());
    assert!(binder.lower_entry_point(&entry).unwrap());
    let module = binder.module();
    let vars = binder.stage_vars();
    assert_eq!(vars.len(), 4);

    for v in vars {
        let len = module.array_len(module.variables[v.var].ty);
        match v.direction {
            Direction::Input => assert_eq!(len, Some(3)),
            Direction::Output => assert_eq!(len, None),
        }
    }
    let color_in = vars
        .iter()
        .find(|v| v.direction == Direction::Input && v.builtin.is_none())
        .unwrap();
    assert_eq!(color_in.location, Some(0));
}

// ---- Resources and aliasing ----

#[test]
fn resources_get_bindings() {
    let params = structure(
        "Params",
        vec![field("scale", SourceType::scalar(ScalarType::FLOAT), "")],
    );
    let globals = vec![
        VarDecl::new(1, "params", SourceType::resource(ResourceKind::ConstantBuffer, Some(params)), VarStorage::Extern),
        VarDecl::new(2, "out_buf", append(), VarStorage::Extern),
        VarDecl::new(3, "gain", SourceType::scalar(ScalarType::FLOAT), VarStorage::Extern),
        VarDecl::new(
            4,
            "samp",
            SourceType::resource(ResourceKind::Sampler { comparison: false }, None),
            VarStorage::Extern,
        ),
    ];

    let mut binder = Binder::new(ShaderStage::Compute, opts());
    for g in &globals {
        if g.ty.is_resource_or_array_of() {
            binder.create_extern_var(g).unwrap();
        }
    }
    let cb = binder.create_globals_cbuffer(&globals).unwrap().unwrap();
    assert!(binder.decorate_resource_bindings().unwrap());

    let module = binder.module();
    let mut slots: Vec<_> = binder
        .resource_vars()
        .iter()
        .map(|rv| module.variables[rv.var].resource_binding().unwrap().binding)
        .collect();
    slots.sort_unstable();
    // params, out_buf, its counter, samp, $Globals
    assert_eq!(slots, vec![0, 1, 2, 3, 4]);
    assert_eq!(module.variables[cb].class, StorageClass::Uniform);
}

#[test]
fn counters_follow_struct_paths() {
    let pair = structure("Pair", vec![field("first", append(), ""), field("second", append(), "")]);
    let mut binder = Binder::new(ShaderStage::Compute, opts());
    binder
        .create_file_var(&VarDecl::new(1, "a", pair.clone(), VarStorage::Static))
        .unwrap();
    binder
        .create_fn_var(&VarDecl::new(2, "b", pair, VarStorage::Local))
        .unwrap();
    assert!(binder.needs_legalization());

    let a = binder.counter_fields(DeclId(1)).unwrap();
    let paths: Vec<_> = a.iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, vec![IndexPath::from(vec![0]), IndexPath::from(vec![1])]);

    let copies = binder.assign_counters(DeclId(2), DeclId(1)).unwrap();
    assert_eq!(copies.len(), 2);
    for (copy, index) in copies.iter().zip([0, 1]) {
        let path = IndexPath::from(vec![index]);
        assert_eq!(copy.src, binder.counter_pair(DeclId(1), &path).unwrap().counter);
        assert_eq!(copy.dst, binder.counter_pair(DeclId(2), &path).unwrap().counter);
    }

    // b.second = a.first
    let copies = binder
        .assign_counters_at(DeclId(2), &IndexPath::from(vec![1]), DeclId(1), &IndexPath::from(vec![0]))
        .unwrap();
    assert_eq!(
        copies,
        vec![CounterCopy {
            dst: binder.counter_pair(DeclId(2), &IndexPath::from(vec![1])).unwrap().counter,
            src: binder.counter_pair(DeclId(1), &IndexPath::from(vec![0])).unwrap().counter,
        }]
    );

    let module = binder.module();
    let var = module.variables[binder.var_for(DeclId(2)).unwrap()].ty;
    let TypeInner::Struct { members } = &module.types[var].inner else {
        panic!("expected a struct");
    };
    assert!(members
        .iter()
        .all(|m| matches!(module.types[m.ty].inner, TypeInner::Pointer { .. })));
}
