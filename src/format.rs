//! Formatting methods for materialized types.

use std::fmt::Write;
use std::rc::Rc;

use crate::materialize::TypeCache;
use crate::types::{EnumValue, QualifiedType, Type, TypeKind, TypeRepr};
use crate::Error;

fn qualifier_prefix(qualified: &QualifiedType) -> String {
    let mut out = String::new();
    if qualified.qualifiers.contains(crate::Qualifiers::CONST) {
        out.push_str("const ");
    }
    if qualified.qualifiers.contains(crate::Qualifiers::VOLATILE) {
        out.push_str("volatile ");
    }
    if qualified.qualifiers.contains(crate::Qualifiers::RESTRICT) {
        out.push_str("restrict ");
    }
    if qualified.qualifiers.contains(crate::Qualifiers::ATOMIC) {
        out.push_str("_Atomic ");
    }
    out
}

// The base specifier for a non-derived type: "int", "struct foo",
// "enum { ... }" for anonymous enums, etc.
fn specifier(cache: &TypeCache, typ: &Rc<Type>, tablevel: usize) -> Result<String, Error> {
    let out = match typ.repr() {
        TypeRepr::Void => "void".to_string(),
        TypeRepr::Int { name, .. }
        | TypeRepr::Bool { name, .. }
        | TypeRepr::Float { name, .. }
        | TypeRepr::Complex { name, .. }
        | TypeRepr::Typedef { name, .. } => name.clone(),
        TypeRepr::Compound { kind, tag, .. } => match tag {
            Some(tag) => format!("{} {}", kind.keyword(), tag),
            // anonymous compounds get their body printed inline
            None => compound_body(cache, typ, kind.keyword(), None, tablevel, 0)?,
        },
        TypeRepr::Enum { tag, .. } => match tag {
            Some(tag) => format!("enum {tag}"),
            None => enum_body(typ, None, tablevel)?,
        },
        // derived types are handled by the declarator walk
        TypeRepr::Pointer { .. } | TypeRepr::Array { .. } | TypeRepr::Function { .. } => {
            unreachable!("derived type reached the specifier")
        }
    };
    Ok(out)
}

// Wrap `decl` in the declarator syntax for a derived type chain and
// return the underlying base type alongside it.
fn declarator(
    cache: &TypeCache,
    qualified: &QualifiedType,
    decl: String,
) -> Result<(QualifiedType, String), Error> {
    match qualified.typ.repr() {
        TypeRepr::Pointer { referenced, .. } => {
            let decl = format!("*{}{}", qualifier_prefix(qualified), decl);
            // pointers to arrays and functions need parentheses to bind
            // before the suffix
            let decl = match referenced.typ.kind() {
                TypeKind::Array | TypeKind::Function => format!("({decl})"),
                _ => decl,
            };
            declarator(cache, referenced, decl)
        }
        TypeRepr::Array { element, length } => {
            let bound = match length {
                Some(length) => format!("[{length}]"),
                None => "[]".to_string(),
            };
            declarator(cache, element, format!("{decl}{bound}"))
        }
        TypeRepr::Function {
            return_type,
            parameters,
            is_variadic,
        } => {
            let mut params = Vec::new();
            for parameter in parameters {
                let param_type = parameter.typ.evaluate(cache)?;
                params.push(format_decl(
                    cache,
                    &param_type,
                    parameter.name.as_deref().unwrap_or(""),
                )?);
            }
            if *is_variadic {
                params.push("...".to_string());
            } else if params.is_empty() {
                params.push("void".to_string());
            }
            let decl = format!("{decl}({})", params.join(", "));
            declarator(cache, return_type, decl)
        }
        _ => Ok((qualified.clone(), decl)),
    }
}

fn format_decl_at(
    cache: &TypeCache,
    qualified: &QualifiedType,
    name: &str,
    tablevel: usize,
) -> Result<String, Error> {
    let (base, decl) = declarator(cache, qualified, name.to_string())?;
    let prefix = qualifier_prefix(&base);
    let spec = specifier(cache, &base.typ, tablevel)?;
    if decl.is_empty() {
        Ok(format!("{prefix}{spec}"))
    } else {
        Ok(format!("{prefix}{spec} {decl}"))
    }
}

/// Render a qualified type and a declared name as a C-like declaration,
/// e.g. `const char *name[4]`.
pub fn format_decl(
    cache: &TypeCache,
    qualified: &QualifiedType,
    name: &str,
) -> Result<String, Error> {
    format_decl_at(cache, qualified, name, 0)
}

fn tabs(tablevel: usize) -> String {
    "    ".repeat(tablevel)
}

fn compound_body(
    cache: &TypeCache,
    typ: &Rc<Type>,
    keyword: &str,
    tag: Option<&str>,
    tablevel: usize,
    verbosity: u8,
) -> Result<String, Error> {
    let mut out = String::new();
    match tag {
        Some(tag) => out.push_str(&format!("{keyword} {tag} {{\n")),
        None => out.push_str(&format!("{keyword} {{\n")),
    }
    if let Some(members) = typ.members() {
        for member in members {
            let member_type = member.typ.evaluate(cache)?;
            let decl = format_decl_at(
                cache,
                &member_type,
                member.name.as_deref().unwrap_or(""),
                tablevel + 1,
            )?;
            out.push_str(&tabs(tablevel + 1));
            out.push_str(&decl);
            if let Some(bit_field_size) = member.bit_field_size {
                write!(out, " : {bit_field_size}").unwrap();
            }
            out.push(';');
            if verbosity > 0 {
                let size = member_type
                    .typ
                    .size()
                    .map(|size| size.to_string())
                    .unwrap_or_else(|| "?".to_string());
                write!(out, " /* size: {} | offset: {} */", size, member.bit_offset / 8)
                    .unwrap();
            }
            out.push('\n');
        }
    }
    out.push_str(&tabs(tablevel));
    out.push('}');
    Ok(out)
}

fn enum_body(typ: &Rc<Type>, tag: Option<&str>, tablevel: usize) -> Result<String, Error> {
    let mut out = String::new();
    match tag {
        Some(tag) => out.push_str(&format!("enum {tag} {{\n")),
        None => out.push_str("enum {\n"),
    }
    if let Some(enumerators) = typ.enumerators() {
        for enumerator in enumerators {
            out.push_str(&tabs(tablevel + 1));
            match enumerator.value {
                EnumValue::Signed(value) => {
                    write!(out, "{} = {},\n", enumerator.name, value).unwrap()
                }
                EnumValue::Unsigned(value) => {
                    write!(out, "{} = {},\n", enumerator.name, value).unwrap()
                }
            }
        }
    }
    out.push_str(&tabs(tablevel));
    out.push('}');
    Ok(out)
}

/// Render the full definition of a type: compound and enum bodies with
/// their members, everything else as a plain declaration. At verbosity
/// above zero struct members get `/* size | offset */` comments.
pub fn format_definition(
    cache: &TypeCache,
    typ: &Rc<Type>,
    verbosity: u8,
) -> Result<String, Error> {
    match typ.repr() {
        TypeRepr::Compound { kind, tag, def } => {
            if def.is_none() {
                return Ok(format!(
                    "{} {};",
                    kind.keyword(),
                    tag.as_deref().unwrap_or("")
                ));
            }
            let mut out = compound_body(cache, typ, kind.keyword(), tag.as_deref(), 0, verbosity)?;
            if verbosity > 0 {
                if let Some(size) = typ.size() {
                    out.push_str(&format!(" /* total size: {size} */"));
                }
            }
            out.push(';');
            Ok(out)
        }
        TypeRepr::Enum { tag, def } => {
            if def.is_none() {
                return Ok(format!("enum {};", tag.as_deref().unwrap_or("")));
            }
            let mut out = enum_body(typ, tag.as_deref(), 0)?;
            out.push(';');
            Ok(out)
        }
        TypeRepr::Typedef { name, aliased } => {
            let decl = format_decl(cache, aliased, name)?;
            Ok(format!("typedef {decl};"))
        }
        _ => {
            let qualified = QualifiedType {
                typ: typ.clone(),
                qualifiers: crate::Qualifiers::empty(),
            };
            Ok(format!("{};", format_decl(cache, &qualified, "")?))
        }
    }
}
