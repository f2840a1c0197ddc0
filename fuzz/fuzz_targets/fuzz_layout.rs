#![no_main]

use libfuzzer_sys::fuzz_target;
use spvx_ast::{DeclAttrs, FieldDecl, Majorness, ScalarType, SourceType, StructDecl};
use spvx_lower::{LayoutRule, LowerOptions, TypeTranslator, layout};

const RULES: [LayoutRule; 7] = [
    LayoutRule::GlslStd140,
    LayoutRule::GlslStd430,
    LayoutRule::RelaxedGlslStd140,
    LayoutRule::RelaxedGlslStd430,
    LayoutRule::FxcCtBuffer,
    LayoutRule::FxcSBuffer,
    LayoutRule::Scalar,
];

/// Decodes a bounded type tree from the input bytes.
struct Decoder<'a> {
    data: &'a [u8],
}

impl Decoder<'_> {
    fn byte(&mut self) -> u8 {
        let (&b, rest) = self.data.split_first().unwrap_or((&0, &[]));
        self.data = rest;
        b
    }

    fn scalar(&mut self) -> ScalarType {
        match self.byte() % 6 {
            0 => ScalarType::FLOAT,
            1 => ScalarType::INT,
            2 => ScalarType::UINT,
            3 => ScalarType::HALF,
            4 => ScalarType::DOUBLE,
            _ => ScalarType::BOOL,
        }
    }

    fn ty(&mut self, depth: u32) -> SourceType {
        let tag = if depth > 3 { self.byte() % 3 } else { self.byte() % 6 };
        match tag {
            0 => SourceType::scalar(self.scalar()),
            1 => SourceType::vector(self.scalar(), u32::from(self.byte() % 4) + 1),
            2 => {
                let m = SourceType::matrix(
                    ScalarType::FLOAT,
                    u32::from(self.byte() % 4) + 1,
                    u32::from(self.byte() % 4) + 1,
                );
                if self.byte() % 2 == 0 {
                    SourceType::oriented(Majorness::RowMajor, m)
                } else {
                    m
                }
            }
            3 => SourceType::array(self.ty(depth + 1), u32::from(self.byte() % 5) + 1),
            4 => SourceType::alias("T", self.ty(depth + 1)),
            _ => {
                let count = self.byte() % 5;
                let fields = (0..count)
                    .map(|i| FieldDecl::new(format!("f{i}"), self.ty(depth + 1), DeclAttrs::default()))
                    .collect();
                SourceType::structure(StructDecl {
                    name: format!("S{depth}"),
                    base: None,
                    fields,
                })
            }
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let ty = Decoder { data }.ty(0);
    let options = LowerOptions::default();
    let mut translator = TypeTranslator::new(options);
    for rule in RULES {
        let computed = layout::layout(&ty, rule, &options);
        assert_eq!(computed, layout::layout(&ty, rule, &options));
        if rule.is_std140_family() && ty.as_struct().is_some() {
            assert_eq!(computed.alignment % 16, 0);
        }
        // Translation must not panic or fail for well-formed value types.
        let handle = translator.translate(&ty, rule);
        assert!(handle.is_ok(), "{ty} under {rule}");
    }
});
