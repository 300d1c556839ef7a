//! Debug pretty-printer for the tree structure.
//!
//! Produces a JSON document mirroring the node layout: inner nodes as
//! `{"keys": [...], "children": [...]}` with composite separators
//! formatted `key(page,slot)`, leaves as `{"keys": ["key:[(p,s),...]"]}`
//! with duplicate keys collapsed into one RID list.

use serde_json::{json, Value as Json};

use crate::datum::Attribute;
use crate::heap::RID_SIZE;
use crate::index::error::IndexError;
use crate::index::key;
use crate::index::node::{NodePage, NODE_PTR_SIZE};
use crate::index::tree::IndexFile;
use crate::storage::{PageNum, PagedFile, PAGE_SIZE};

impl IndexFile {
    /// Renders the whole tree as a JSON value.
    pub fn to_json(&mut self, attr: &Attribute) -> Result<Json, IndexError> {
        let root = self.root()?;
        node_json(self.file_mut(), root, attr)
    }

    /// Renders the whole tree as pretty-printed JSON text.
    pub fn dump(&mut self, attr: &Attribute) -> Result<String, IndexError> {
        let json = self.to_json(attr)?;
        serde_json::to_string_pretty(&json)
            .map_err(|e| IndexError::Corrupted(format!("tree rendering failed: {}", e)))
    }
}

fn node_json(
    file: &mut PagedFile,
    node_num: PageNum,
    attr: &Attribute,
) -> Result<Json, IndexError> {
    let mut buf = [0u8; PAGE_SIZE];
    file.read_page(node_num, &mut buf)?;
    let node = NodePage::new(&buf[..]);
    let used_end = node.used_end();

    if !node.is_leaf() {
        let mut keys = Vec::new();
        let mut children = vec![node.child_at(node.entries_start())];
        let mut offset = node.entries_start() + NODE_PTR_SIZE;
        while offset < used_end {
            let klen = key::encoded_len(attr, &node.as_bytes()[offset..]);
            let value = key::decode(attr, &node.as_bytes()[offset..]);
            let rid = node.rid_at(offset + klen);
            keys.push(format!("{}{}", value, rid));
            offset += klen + RID_SIZE;
            children.push(node.child_at(offset));
            offset += NODE_PTR_SIZE;
        }

        let children = children
            .into_iter()
            .map(|child| node_json(file, child, attr))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(json!({ "keys": keys, "children": children }));
    }

    // Leaf: collapse runs of equal keys into one "key:[(p,s),...]" item.
    let mut keys: Vec<String> = Vec::new();
    let mut current: Option<(Vec<u8>, Vec<String>)> = None;
    let mut offset = node.entries_start();
    while offset < used_end {
        let klen = key::encoded_len(attr, &node.as_bytes()[offset..]);
        let key_bytes = node.as_bytes()[offset..offset + klen].to_vec();
        let rid = node.rid_at(offset + klen);
        offset += klen + RID_SIZE;

        match &mut current {
            Some((cur, rids)) if key::compare(attr, cur, &key_bytes).is_eq() => {
                rids.push(rid.to_string());
            }
            _ => {
                if let Some((cur, rids)) = current.take() {
                    keys.push(format_leaf_key(attr, &cur, &rids));
                }
                current = Some((key_bytes, vec![rid.to_string()]));
            }
        }
    }
    if let Some((cur, rids)) = current {
        keys.push(format_leaf_key(attr, &cur, &rids));
    }
    Ok(json!({ "keys": keys }))
}

fn format_leaf_key(attr: &Attribute, key_bytes: &[u8], rids: &[String]) -> String {
    format!("{}:[{}]", key::decode(attr, key_bytes), rids.join(","))
}
