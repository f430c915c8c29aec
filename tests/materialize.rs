mod common;

use std::rc::Rc;

use common::*;
use dwmat::{Error, Qualifiers, TypeCache, TypeKind};
use gimli::write::AttributeValue;

#[test]
fn base_types_map_encodings_to_kinds() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        add_base_type(dwarf, "int", gimli::DW_ATE_signed, 4);
        add_base_type(dwarf, "unsigned char", gimli::DW_ATE_unsigned_char, 1);
        add_base_type(dwarf, "_Bool", gimli::DW_ATE_boolean, 1);
        add_base_type(dwarf, "double", gimli::DW_ATE_float, 8);
    });
    let cache = TypeCache::new(&dwarf)?;

    let int = cache.find_type(TypeKind::Int, "int", None)?.unwrap();
    assert_eq!(int.typ.kind(), TypeKind::Int);
    assert!(int.typ.is_signed());
    assert_eq!(int.typ.size(), Some(4));

    let uchar = cache
        .find_type(TypeKind::Int, "unsigned char", None)?
        .unwrap();
    assert!(!uchar.typ.is_signed());

    let boolean = cache.find_type(TypeKind::Bool, "_Bool", None)?.unwrap();
    assert_eq!(boolean.typ.kind(), TypeKind::Bool);

    let double = cache.find_type(TypeKind::Float, "double", None)?.unwrap();
    assert_eq!(double.typ.kind(), TypeKind::Float);
    assert_eq!(double.typ.size(), Some(8));

    // One DWARF tag covers three kinds; a kind mismatch is not a match.
    assert!(cache.find_type(TypeKind::Float, "int", None)?.is_none());
    Ok(())
}

#[test]
fn unknown_base_encoding_is_malformed() {
    let dwarf = build_dwarf(|dwarf| {
        add_base_type(dwarf, "odd", gimli::DwAte(0x7f), 4);
    });
    let cache = TypeCache::new(&dwarf).unwrap();
    let err = cache.find_type(TypeKind::Int, "odd", None).unwrap_err();
    assert!(matches!(err, Error::MalformedDwarf(_)));
}

#[test]
fn memoization_returns_pointer_equal_descriptors() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        add_int(dwarf, "int", 4, true);
    });
    let cache = TypeCache::new(&dwarf)?;
    let first = cache.find_type(TypeKind::Int, "int", None)?.unwrap();
    let second = cache.find_type(TypeKind::Int, "int", None)?.unwrap();
    assert!(Rc::ptr_eq(&first.typ, &second.typ));
    Ok(())
}

#[test]
fn first_match_wins_across_duplicate_names() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        add_int(dwarf, "int", 4, true);
        add_int(dwarf, "int", 4, true);
    });
    let cache = TypeCache::new(&dwarf)?;
    let found = cache.find_type(TypeKind::Int, "int", None)?;
    assert!(found.is_some());
    Ok(())
}

#[test]
fn filename_filter_matches_unit_name_suffix() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        add_int(dwarf, "int", 4, true);
    });
    let cache = TypeCache::new(&dwarf)?;
    assert!(cache
        .find_type(TypeKind::Int, "int", Some(CU_NAME))?
        .is_some());
    assert!(cache
        .find_type(TypeKind::Int, "int", Some("other.c"))?
        .is_none());
    Ok(())
}

#[test]
fn qualifier_chains_commute_and_accumulate() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let root = dwarf.unit.root();

        let const_inner = dwarf.unit.add(root, gimli::DW_TAG_const_type);
        set_type(dwarf, const_inner, int);
        let volatile_outer = dwarf.unit.add(root, gimli::DW_TAG_volatile_type);
        set_type(dwarf, volatile_outer, const_inner);
        add_typedef(dwarf, "vc_int", Some(volatile_outer));

        let volatile_inner = dwarf.unit.add(root, gimli::DW_TAG_volatile_type);
        set_type(dwarf, volatile_inner, int);
        let const_outer = dwarf.unit.add(root, gimli::DW_TAG_const_type);
        set_type(dwarf, const_outer, volatile_inner);
        add_typedef(dwarf, "cv_int", Some(const_outer));
    });
    let cache = TypeCache::new(&dwarf)?;

    let vc = cache.find_type(TypeKind::Typedef, "vc_int", None)?.unwrap();
    let cv = cache.find_type(TypeKind::Typedef, "cv_int", None)?.unwrap();
    let vc_aliased = vc.typ.aliased().unwrap();
    let cv_aliased = cv.typ.aliased().unwrap();

    assert_eq!(
        vc_aliased.qualifiers,
        Qualifiers::CONST | Qualifiers::VOLATILE
    );
    assert_eq!(vc_aliased.qualifiers, cv_aliased.qualifiers);
    // Both chains bottom out in the same memoized int descriptor.
    assert!(Rc::ptr_eq(&vc_aliased.typ, &cv_aliased.typ));
    assert_eq!(vc_aliased.typ.kind(), TypeKind::Int);
    Ok(())
}

#[test]
fn typedef_of_pointer_to_self_closes_the_cycle() -> anyhow::Result<()> {
    // struct node { struct node *next; }; typedef struct node node_t;
    let dwarf = build_dwarf(|dwarf| {
        let node = add_struct(dwarf, Some("node"), 8);
        let root = dwarf.unit.root();
        let pointer = dwarf.unit.add(root, gimli::DW_TAG_pointer_type);
        set_type(dwarf, pointer, node);
        add_member(dwarf, node, Some("next"), pointer, 0);
        add_typedef(dwarf, "node_t", Some(node));
    });
    let cache = TypeCache::new(&dwarf)?;

    let node_t = cache.find_type(TypeKind::Typedef, "node_t", None)?.unwrap();
    let node = node_t.typ.aliased().unwrap();
    assert_eq!(node.typ.kind(), TypeKind::Struct);

    let members = node.typ.members().unwrap();
    assert_eq!(members.len(), 1);
    let next = members[0].typ.evaluate(&cache)?;
    assert_eq!(next.typ.kind(), TypeKind::Pointer);
    let pointee = next.typ.referenced().unwrap();
    assert!(Rc::ptr_eq(&pointee.typ, &node.typ));
    Ok(())
}

#[test]
fn flexible_array_member_stays_incomplete_only_in_last_position() -> anyhow::Result<()> {
    // struct s { int n; int data[]; };  struct s2 { int data[]; int n; };
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let flexible = add_array(dwarf, int, &[None]);

        let s = add_struct(dwarf, Some("s"), 4);
        add_member(dwarf, s, Some("n"), int, 0);
        add_member(dwarf, s, Some("data"), flexible, 4);

        let s2 = add_struct(dwarf, Some("s2"), 8);
        add_member(dwarf, s2, Some("data"), flexible, 0);
        add_member(dwarf, s2, Some("n"), int, 4);
    });
    let cache = TypeCache::new(&dwarf)?;

    let s = cache.find_type(TypeKind::Struct, "s", None)?.unwrap();
    let members = s.typ.members().unwrap();
    let last = members.last().unwrap().typ.evaluate(&cache)?;
    assert_eq!(last.typ.kind(), TypeKind::Array);
    assert_eq!(last.typ.length(), None);
    assert!(last.typ.is_incomplete_array());

    // The same array DIE in non-last position is forced to length zero.
    let s2 = cache.find_type(TypeKind::Struct, "s2", None)?.unwrap();
    let first = s2.typ.members().unwrap()[0].typ.evaluate(&cache)?;
    assert_eq!(first.typ.kind(), TypeKind::Array);
    assert_eq!(first.typ.length(), Some(0));

    // The incomplete materialization is untouched by the forced one.
    let again = members.last().unwrap().typ.evaluate(&cache)?;
    assert!(Rc::ptr_eq(&again.typ, &last.typ));
    Ok(())
}

#[test]
fn lone_member_cannot_be_a_flexible_array() -> anyhow::Result<()> {
    // struct only { int data[]; }; GCC allows a zero-length array here but
    // not a flexible one.
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let flexible = add_array(dwarf, int, &[None]);
        let only = add_struct(dwarf, Some("only"), 0);
        add_member(dwarf, only, Some("data"), flexible, 0);
    });
    let cache = TypeCache::new(&dwarf)?;
    let only = cache.find_type(TypeKind::Struct, "only", None)?.unwrap();
    let data = only.typ.members().unwrap()[0].typ.evaluate(&cache)?;
    assert_eq!(data.typ.length(), Some(0));
    Ok(())
}

#[test]
fn union_members_cannot_be_flexible_arrays() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let flexible = add_array(dwarf, int, &[None]);
        let root = dwarf.unit.root();
        let u = dwarf.unit.add(root, gimli::DW_TAG_union_type);
        set_name(dwarf, u, "u");
        dwarf
            .unit
            .get_mut(u)
            .set(gimli::DW_AT_byte_size, AttributeValue::Udata(4));
        add_member(dwarf, u, Some("a"), int, 0);
        add_member(dwarf, u, Some("data"), flexible, 0);
    });
    let cache = TypeCache::new(&dwarf)?;
    let u = cache.find_type(TypeKind::Union, "u", None)?.unwrap();
    let last = u.typ.members().unwrap().last().unwrap().typ.evaluate(&cache)?;
    assert_eq!(last.typ.length(), Some(0));
    Ok(())
}

#[test]
fn typedef_propagates_incomplete_arrays_to_member_contexts() -> anyhow::Result<()> {
    // typedef int arr_t[]; struct h { arr_t data; int n; };
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let flexible = add_array(dwarf, int, &[None]);
        let arr_t = add_typedef(dwarf, "arr_t", Some(flexible));
        let h = add_struct(dwarf, Some("h"), 8);
        add_member(dwarf, h, Some("data"), arr_t, 0);
        add_member(dwarf, h, Some("n"), int, 4);
    });
    let cache = TypeCache::new(&dwarf)?;

    // Standalone, the typedef keeps the array incomplete.
    let standalone = cache.find_type(TypeKind::Typedef, "arr_t", None)?.unwrap();
    assert!(standalone.typ.is_incomplete_array());

    // As a non-last member the whole chain is forced to length zero.
    let h = cache.find_type(TypeKind::Struct, "h", None)?.unwrap();
    let data = h.typ.members().unwrap()[0].typ.evaluate(&cache)?;
    assert_eq!(data.typ.kind(), TypeKind::Typedef);
    let inner = data.typ.aliased().unwrap();
    assert_eq!(inner.typ.length(), Some(0));

    // The standalone materialization is still the incomplete one.
    let standalone_again = cache.find_type(TypeKind::Typedef, "arr_t", None)?.unwrap();
    assert!(Rc::ptr_eq(&standalone.typ, &standalone_again.typ));
    assert!(standalone_again.typ.is_incomplete_array());
    Ok(())
}

#[test]
fn array_bound_boundaries() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        // GCC's empty-array idiom: signed upper bound of -1.
        let empty = add_array(dwarf, int, &[Some(AttributeValue::Sdata(-1))]);
        add_typedef(dwarf, "empty_t", Some(empty));

        let max = add_array(dwarf, int, &[Some(AttributeValue::Udata(u64::MAX - 1))]);
        add_typedef(dwarf, "max_t", Some(max));

        let over = add_array(dwarf, int, &[Some(AttributeValue::Udata(u64::MAX))]);
        add_typedef(dwarf, "over_t", Some(over));
    });
    let cache = TypeCache::new(&dwarf)?;

    let empty = cache.find_type(TypeKind::Typedef, "empty_t", None)?.unwrap();
    let empty_array = empty.typ.aliased().unwrap();
    assert_eq!(empty_array.typ.length(), Some(0));
    assert!(!empty_array.typ.is_incomplete_array());

    let max = cache.find_type(TypeKind::Typedef, "max_t", None)?.unwrap();
    assert_eq!(max.typ.aliased().unwrap().typ.length(), Some(u64::MAX));

    let err = cache
        .find_type(TypeKind::Typedef, "over_t", None)
        .unwrap_err();
    assert!(matches!(err, Error::Overflow(_)));
    Ok(())
}

#[test]
fn multidimensional_arrays_force_inner_lengths() -> anyhow::Result<()> {
    // int m[][3]: outer dimension unknown, inner sized.
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let m = add_array(dwarf, int, &[None, Some(AttributeValue::Udata(2))]);
        add_typedef(dwarf, "m_t", Some(m));
    });
    let cache = TypeCache::new(&dwarf)?;
    let m = cache.find_type(TypeKind::Typedef, "m_t", None)?.unwrap();
    let outer = m.typ.aliased().unwrap();
    assert_eq!(outer.typ.length(), None);
    let inner = outer.typ.element().unwrap();
    assert_eq!(inner.typ.length(), Some(3));
    assert_eq!(inner.typ.element().unwrap().typ.kind(), TypeKind::Int);
    Ok(())
}

#[test]
fn complex_base_type_recurses_into_component() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let double = add_base_type(dwarf, "double", gimli::DW_ATE_float, 8);
        let complex = add_base_type(dwarf, "complex double", gimli::DW_ATE_complex_float, 16);
        set_type(dwarf, complex, double);
        add_typedef(dwarf, "cplx_t", Some(complex));
    });
    let cache = TypeCache::new(&dwarf)?;
    let cplx = cache.find_type(TypeKind::Typedef, "cplx_t", None)?.unwrap();
    let complex = cplx.typ.aliased().unwrap();
    assert_eq!(complex.typ.kind(), TypeKind::Complex);
    assert_eq!(complex.typ.size(), Some(16));
    let real = complex.typ.real_type().unwrap();
    assert_eq!(real.kind(), TypeKind::Float);
    assert_eq!(real.size(), Some(8));
    Ok(())
}

#[test]
fn enum_without_type_fabricates_signed_compatible_type() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        add_enum(
            dwarf,
            Some("e"),
            4,
            &[
                ("A", AttributeValue::Sdata(-1)),
                ("B", AttributeValue::Sdata(0)),
            ],
        );
    });
    let cache = TypeCache::new(&dwarf)?;
    let e = cache.find_type(TypeKind::Enum, "e", None)?.unwrap();
    let compatible = e.typ.compatible_type().unwrap();
    assert_eq!(compatible.kind(), TypeKind::Int);
    assert!(compatible.is_signed());
    assert_eq!(compatible.size(), Some(4));
    assert_eq!(e.typ.enumerators().unwrap().len(), 2);
    Ok(())
}

#[test]
fn enum_with_unsigned_enumerators_fabricates_unsigned() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        add_enum(
            dwarf,
            Some("flags"),
            4,
            &[
                ("F_A", AttributeValue::Udata(1)),
                ("F_B", AttributeValue::Udata(2)),
            ],
        );
    });
    let cache = TypeCache::new(&dwarf)?;
    let e = cache.find_type(TypeKind::Enum, "flags", None)?.unwrap();
    assert!(!e.typ.compatible_type().unwrap().is_signed());
    Ok(())
}

#[test]
fn enum_with_explicit_type_uses_it() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let uint = add_int(dwarf, "unsigned int", 4, false);
        let e = add_enum(dwarf, Some("e"), 4, &[("A", AttributeValue::Udata(0))]);
        set_type(dwarf, e, uint);
    });
    let cache = TypeCache::new(&dwarf)?;
    let e = cache.find_type(TypeKind::Enum, "e", None)?.unwrap();
    let compatible = e.typ.compatible_type().unwrap();
    assert_eq!(compatible.name(), Some("unsigned int"));
    Ok(())
}

#[test]
fn declaration_with_one_definition_resolves_to_it() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let decl = add_struct_declaration(dwarf, "foo");
        add_typedef(dwarf, "foo_t", Some(decl));
        let def = add_struct(dwarf, Some("foo"), 4);
        add_member(dwarf, def, Some("x"), int, 0);
    });
    let cache = TypeCache::new(&dwarf)?;
    let foo_t = cache.find_type(TypeKind::Typedef, "foo_t", None)?.unwrap();
    let resolved = foo_t.typ.aliased().unwrap();
    assert!(resolved.typ.is_complete());
    assert_eq!(resolved.typ.members().unwrap().len(), 1);

    // The declaration resolved to the same descriptor a direct lookup of
    // the definition produces.
    let direct = cache.find_type(TypeKind::Struct, "foo", None)?.unwrap();
    assert!(Rc::ptr_eq(&direct.typ, &resolved.typ));
    Ok(())
}

#[test]
fn ambiguous_declaration_stays_incomplete() -> anyhow::Result<()> {
    // Two complete definitions of struct foo: don't guess.
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let decl = add_struct_declaration(dwarf, "foo");
        add_typedef(dwarf, "foo_t", Some(decl));
        let def1 = add_struct(dwarf, Some("foo"), 4);
        add_member(dwarf, def1, Some("x"), int, 0);
        let def2 = add_struct(dwarf, Some("foo"), 4);
        add_member(dwarf, def2, Some("y"), int, 0);
    });
    let cache = TypeCache::new(&dwarf)?;
    let foo_t = cache.find_type(TypeKind::Typedef, "foo_t", None)?.unwrap();
    let resolved = foo_t.typ.aliased().unwrap();
    assert_eq!(resolved.typ.kind(), TypeKind::Struct);
    assert!(!resolved.typ.is_complete());
    assert!(resolved.typ.members().is_none());
    Ok(())
}

#[test]
fn declaration_with_no_definition_stays_incomplete() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let decl = add_struct_declaration(dwarf, "ghost");
        add_typedef(dwarf, "ghost_t", Some(decl));
    });
    let cache = TypeCache::new(&dwarf)?;
    let ghost = cache.find_type(TypeKind::Typedef, "ghost_t", None)?.unwrap();
    assert!(!ghost.typ.aliased().unwrap().typ.is_complete());
    Ok(())
}

#[test]
fn bit_field_offsets_little_endian() -> anyhow::Result<()> {
    // 32-bit storage unit, bit_offset 29, bit size 3: starts at bit 0.
    let dwarf = build_dwarf(|dwarf| {
        let uint = add_int(dwarf, "unsigned int", 4, false);
        let s = add_struct(dwarf, Some("bits"), 4);
        let member = add_member(dwarf, s, Some("f"), uint, 0);
        let entry = dwarf.unit.get_mut(member);
        entry.set(gimli::DW_AT_bit_offset, AttributeValue::Udata(29));
        entry.set(gimli::DW_AT_bit_size, AttributeValue::Udata(3));
    });
    let cache = TypeCache::new(&dwarf)?;
    let s = cache.find_type(TypeKind::Struct, "bits", None)?.unwrap();
    let member = &s.typ.members().unwrap()[0];
    assert_eq!(member.bit_offset, 0);
    assert_eq!(member.bit_field_size, Some(3));
    Ok(())
}

#[test]
fn bit_field_offsets_big_endian() -> anyhow::Result<()> {
    let dwarf = build_dwarf_endian(dwmat::ByteOrder::Big, |dwarf| {
        let uint = add_int(dwarf, "unsigned int", 4, false);
        let s = add_struct(dwarf, Some("bits"), 4);
        let member = add_member(dwarf, s, Some("f"), uint, 0);
        let entry = dwarf.unit.get_mut(member);
        entry.set(gimli::DW_AT_bit_offset, AttributeValue::Udata(29));
        entry.set(gimli::DW_AT_bit_size, AttributeValue::Udata(3));
    });
    let cache = TypeCache::new(&dwarf)?;
    let s = cache.find_type(TypeKind::Struct, "bits", None)?.unwrap();
    assert_eq!(s.typ.members().unwrap()[0].bit_offset, 29);
    Ok(())
}

#[test]
fn data_bit_offset_wins_over_legacy_encoding() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let uint = add_int(dwarf, "unsigned int", 4, false);
        let s = add_struct(dwarf, Some("bits"), 4);
        let member = add_member(dwarf, s, Some("f"), uint, 0);
        let entry = dwarf.unit.get_mut(member);
        entry.set(gimli::DW_AT_data_bit_offset, AttributeValue::Udata(7));
        entry.set(gimli::DW_AT_bit_size, AttributeValue::Udata(3));
    });
    let cache = TypeCache::new(&dwarf)?;
    let s = cache.find_type(TypeKind::Struct, "bits", None)?.unwrap();
    assert_eq!(s.typ.members().unwrap()[0].bit_offset, 7);
    Ok(())
}

#[test]
fn recursion_budget_allows_999_and_rejects_1001() -> anyhow::Result<()> {
    for (depth, should_fail) in [(999usize, false), (1001usize, true)] {
        let dwarf = build_dwarf(|dwarf| {
            // A chain of typedefs bottoming out in void; resolving the
            // outermost visits every link.
            let mut previous = None;
            for i in 0..depth {
                let typedef = add_typedef(dwarf, &format!("t{i}"), previous);
                previous = Some(typedef);
            }
        });
        let cache = TypeCache::new(&dwarf)?;
        let outermost = format!("t{}", depth - 1);
        let result = cache.find_type(TypeKind::Typedef, &outermost, None);
        if should_fail {
            assert!(matches!(result, Err(Error::RecursionLimit)));
        } else {
            assert!(result?.is_some());
        }
    }
    Ok(())
}

#[test]
fn function_types_collect_parameters_and_variadics() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let root = dwarf.unit.root();
        let subroutine = dwarf.unit.add(root, gimli::DW_TAG_subroutine_type);
        set_type(dwarf, subroutine, int);
        let param = dwarf.unit.add(subroutine, gimli::DW_TAG_formal_parameter);
        set_type(dwarf, param, int);
        dwarf
            .unit
            .add(subroutine, gimli::DW_TAG_unspecified_parameters);
        add_typedef(dwarf, "fn_t", Some(subroutine));
    });
    let cache = TypeCache::new(&dwarf)?;
    let fn_t = cache.find_type(TypeKind::Typedef, "fn_t", None)?.unwrap();
    let function = fn_t.typ.aliased().unwrap();
    assert_eq!(function.typ.kind(), TypeKind::Function);
    assert!(function.typ.is_variadic());
    let parameters = function.typ.parameters().unwrap();
    assert_eq!(parameters.len(), 1);
    let param = parameters[0].typ.evaluate(&cache)?;
    assert_eq!(param.typ.kind(), TypeKind::Int);
    assert_eq!(function.typ.return_type().unwrap().typ.kind(), TypeKind::Int);
    Ok(())
}

#[test]
fn parameter_after_unspecified_parameters_is_malformed() {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let root = dwarf.unit.root();
        let subroutine = dwarf.unit.add(root, gimli::DW_TAG_subroutine_type);
        dwarf
            .unit
            .add(subroutine, gimli::DW_TAG_unspecified_parameters);
        let param = dwarf.unit.add(subroutine, gimli::DW_TAG_formal_parameter);
        set_type(dwarf, param, int);
        add_typedef(dwarf, "bad_fn_t", Some(subroutine));
    });
    let cache = TypeCache::new(&dwarf).unwrap();
    let err = cache
        .find_type(TypeKind::Typedef, "bad_fn_t", None)
        .unwrap_err();
    assert!(matches!(err, Error::MalformedDwarf(_)));
}

#[test]
fn pointer_size_defaults_to_address_size() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let root = dwarf.unit.root();
        let pointer = dwarf.unit.add(root, gimli::DW_TAG_pointer_type);
        set_type(dwarf, pointer, int);
        add_typedef(dwarf, "int_ptr", Some(pointer));
    });
    let cache = TypeCache::new(&dwarf)?;
    let ptr = cache.find_type(TypeKind::Typedef, "int_ptr", None)?.unwrap();
    assert_eq!(ptr.typ.aliased().unwrap().typ.size(), Some(8));
    Ok(())
}

#[test]
fn typedef_of_missing_type_aliases_void() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        add_typedef(dwarf, "unit_t", None);
    });
    let cache = TypeCache::new(&dwarf)?;
    let unit = cache.find_type(TypeKind::Typedef, "unit_t", None)?.unwrap();
    assert_eq!(unit.typ.aliased().unwrap().typ.kind(), TypeKind::Void);
    Ok(())
}

#[test]
fn anonymous_members_are_allowed() -> anyhow::Result<()> {
    let dwarf = build_dwarf(|dwarf| {
        let int = add_int(dwarf, "int", 4, true);
        let s = add_struct(dwarf, Some("anon"), 4);
        add_member(dwarf, s, None, int, 0);
    });
    let cache = TypeCache::new(&dwarf)?;
    let s = cache.find_type(TypeKind::Struct, "anon", None)?.unwrap();
    let members = s.typ.members().unwrap();
    assert_eq!(members.len(), 1);
    assert!(members[0].name.is_none());
    Ok(())
}
