//! Name index over the loaded debugging information
use std::collections::HashMap;

use fallible_iterator::FallibleIterator;
use gimli::DwTag;

use crate::dwarf::{entry_name, Cu, DieId, Dwarf, GimliDwarf};
use crate::Error;

// Tags whose named definitions are worth finding by name.
const INDEXED_TAGS: &[DwTag] = &[
    gimli::DW_TAG_base_type,
    gimli::DW_TAG_structure_type,
    gimli::DW_TAG_union_type,
    gimli::DW_TAG_class_type,
    gimli::DW_TAG_enumeration_type,
    gimli::DW_TAG_typedef,
    gimli::DW_TAG_variable,
    gimli::DW_TAG_subprogram,
];

#[derive(Copy, Clone, Debug)]
pub(crate) struct IndexEntry {
    pub die: DieId,
    /// The tag the entry was indexed under. For enumerator entries this is
    /// DW_TAG_enumerator while `die` names the parent enumeration.
    pub tag: DwTag,
    /// Load bias to add to any static address found through this entry.
    pub bias: u64,
}

/// Maps names to the DIEs of complete top-level definitions.
///
/// Declaration-only DIEs are never entered, so every hit is a complete
/// definition. Enumerators are entered under their own names, pointing at
/// the parent enumeration DIE.
pub struct NameIndex {
    map: HashMap<String, Vec<IndexEntry>>,
    unit_names: Vec<Option<String>>,
}

impl NameIndex {
    /// Index every named, non-declaration definition in `dwarf`, recording
    /// `bias` as the load bias of the image.
    pub fn build(dwarf: &Dwarf, bias: u64) -> Result<Self, Error> {
        let mut map: HashMap<String, Vec<IndexEntry>> = HashMap::new();
        let mut unit_names: Vec<Option<String>> = Vec::new();

        let gimli_dwarf = dwarf.borrow_dwarf();
        let mut header_idx = 0;
        let mut unit_headers = gimli_dwarf.units();
        while let Ok(Some(header)) = unit_headers.next() {
            let unit = match gimli_dwarf.unit(header) {
                Ok(unit) => unit,
                Err(_) => {
                    unit_names.push(None);
                    header_idx += 1;
                    continue;
                }
            };

            let mut cu_name: Option<String> = None;
            let mut depth = 0isize;
            let mut entries = unit.entries();
            'entries: while let Ok(Some((delta_depth, entry))) = entries.next_dfs() {
                depth += delta_depth;
                if entry.tag() == gimli::DW_TAG_compile_unit {
                    cu_name = entry_name(&gimli_dwarf, entry);
                    continue;
                }
                if !INDEXED_TAGS.contains(&entry.tag()) {
                    continue;
                }
                // Functions and variables below the unit level are locals;
                // only the top-level ones are findable by name.
                if (entry.tag() == gimli::DW_TAG_variable
                    || entry.tag() == gimli::DW_TAG_subprogram)
                    && depth != 1
                {
                    continue;
                }

                let mut attrs = entry.attrs();
                while let Ok(Some(attr)) = attrs.next() {
                    if attr.name() == gimli::DW_AT_declaration {
                        continue 'entries;
                    }
                }

                let die = DieId {
                    unit: header_idx,
                    offset: entry.offset(),
                };
                if entry.tag() == gimli::DW_TAG_enumeration_type {
                    index_enumerators(&gimli_dwarf, &unit, die, bias, &mut map)?;
                }
                if let Some(name) = entry_name(&gimli_dwarf, entry) {
                    map.entry(name).or_default().push(IndexEntry {
                        die,
                        tag: entry.tag(),
                        bias,
                    });
                }
            }
            unit_names.push(cu_name);
            header_idx += 1;
        }

        Ok(NameIndex { map, unit_names })
    }

    /// All index entries for `name` whose tag is one of `tags`, in the
    /// order they were discovered.
    pub(crate) fn iterate<'i>(
        &'i self,
        name: &str,
        tags: &'i [DwTag],
    ) -> impl Iterator<Item = IndexEntry> + 'i {
        self.map
            .get(name)
            .into_iter()
            .flatten()
            .filter(move |entry| tags.contains(&entry.tag))
            .copied()
    }

    /// Whether the DIE's compilation unit matches a source filename
    /// filter. `None` matches everything; otherwise the unit name must end
    /// with `filename` (path-suffix comparison).
    pub(crate) fn unit_matches(&self, die: DieId, filename: Option<&str>) -> bool {
        let Some(filename) = filename else {
            return true;
        };
        match self.unit_names.get(die.unit).and_then(|name| name.as_deref()) {
            Some(unit_name) => unit_name.ends_with(filename),
            None => false,
        }
    }

    /// Names of all indexed definitions with the given tag.
    pub(crate) fn names_with_tag(&self, tag: DwTag) -> Vec<(&str, DieId)> {
        let mut names: Vec<(&str, DieId)> = self
            .map
            .iter()
            .flat_map(|(name, entries)| {
                entries
                    .iter()
                    .filter(move |entry| entry.tag == tag)
                    .map(move |entry| (name.as_str(), entry.die))
            })
            .collect();
        names.sort_unstable_by(|a, b| a.0.cmp(b.0));
        names
    }
}

// Enumerator constants are found through their parent enumeration, so
// enter each enumerator name pointing at the enum DIE.
fn index_enumerators(
    dwarf: &GimliDwarf,
    unit: &Cu,
    enum_die: DieId,
    bias: u64,
    map: &mut HashMap<String, Vec<IndexEntry>>,
) -> Result<(), Error> {
    let mut tree = unit.entries_tree(Some(enum_die.offset))?;
    let root = tree.root()?;
    let mut children = root.children();
    while let Some(child) = children.next()? {
        if child.entry().tag() != gimli::DW_TAG_enumerator {
            continue;
        }
        let Some(name) = entry_name(dwarf, child.entry()) else {
            continue;
        };
        map.entry(name).or_default().push(IndexEntry {
            die: enum_die,
            tag: gimli::DW_TAG_enumerator,
            bias,
        });
    }
    Ok(())
}
