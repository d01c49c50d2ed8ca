//! Attribute operations
//!
//! An element's attributes live in its attribute backing list. Keys are
//! (local name, namespace URI); the checker keeps them unique. Setting an
//! attribute by name is an upsert: an existing attribute keeps its node
//! and position and only its value changes.

use std::str::FromStr;

use crate::arena::{check_attribute_namespace, XmlArena};
use crate::backing::ListRef;
use crate::checker;
use crate::error::{DomError, Result};
use crate::filter::Filter;
use crate::namespace::Namespace;
use crate::types::{AttributeData, AttributeType, NodeData, NodeId};
use crate::verifier;
use crate::view::FilteredView;

impl XmlArena {
    pub fn attribute_data(&self, id: NodeId) -> Result<&AttributeData> {
        let node = self.node(id)?;
        node.as_attribute()
            .ok_or_else(|| DomError::wrong_kind("Attribute", node.kind()))
    }

    fn attribute_data_mut(&mut self, id: NodeId) -> Result<&mut AttributeData> {
        match &mut self.node_mut(id)?.data {
            NodeData::Attribute(attr) => Ok(attr),
            other => Err(DomError::wrong_kind("Attribute", other.kind())),
        }
    }

    // ----- element side -------------------------------------------------

    /// Live view of an element's attributes
    pub fn attributes(&self, element: NodeId) -> Result<FilteredView> {
        let list = ListRef::attributes(element);
        self.list(list)?;
        Ok(FilteredView::new(list, Filter::Any))
    }

    pub fn has_attributes(&self, element: NodeId) -> Result<bool> {
        Ok(!self.list(ListRef::attributes(element))?.is_empty())
    }

    /// Attribute with this local name and no namespace
    pub fn attribute(&self, element: NodeId, name: &str) -> Result<Option<NodeId>> {
        self.attribute_ns(element, name, &Namespace::none())
    }

    /// Attribute with this local name in the namespace (matched by URI)
    pub fn attribute_ns(
        &self,
        element: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<Option<NodeId>> {
        for id in self.list(ListRef::attributes(element))?.iter() {
            if self.attribute_data(id)?.has_key(name, namespace) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    pub fn attribute_value(&self, element: NodeId, name: &str) -> Result<Option<&str>> {
        self.attribute_value_ns(element, name, &Namespace::none())
    }

    pub fn attribute_value_ns(
        &self,
        element: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<Option<&str>> {
        match self.attribute_ns(element, name, namespace)? {
            Some(id) => Ok(Some(self.attribute_data(id)?.value())),
            None => Ok(None),
        }
    }

    /// Set a value by name. Updates an existing attribute in place (no
    /// structural change) or appends a new one. Returns the attribute id.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<NodeId> {
        self.set_attribute_ns(element, name, value, &Namespace::none())
    }

    pub fn set_attribute_ns(
        &mut self,
        element: NodeId,
        name: &str,
        value: &str,
        namespace: &Namespace,
    ) -> Result<NodeId> {
        match self.attribute_ns(element, name, namespace)? {
            Some(existing) => {
                self.set_attribute_value(existing, value)?;
                Ok(existing)
            }
            None => {
                // checked before allocating: arena nodes are never freed
                checker::check_attribute_prefix(self, element, namespace, None)?;
                let attr = self.new_attribute_ns(name, value, namespace)?;
                self.append(ListRef::attributes(element), attr)?;
                Ok(attr)
            }
        }
    }

    /// Attach an attribute node. One with the same key is replaced at the
    /// same position and returned, detached.
    pub fn set_attribute_node(&mut self, element: NodeId, attr: NodeId) -> Result<Option<NodeId>> {
        let data = self.attribute_data(attr)?;
        let (name, namespace) = (data.name(), data.namespace());
        let list = ListRef::attributes(element);
        let mut existing = None;
        for (index, id) in self.list(list)?.iter().enumerate() {
            if self.attribute_data(id)?.has_key(name, namespace) {
                existing = Some(index);
                break;
            }
        }
        match existing {
            Some(index) => self.replace_at(list, index, attr).map(Some),
            None => self.append(list, attr).map(|_| None),
        }
    }

    /// Replace every attribute at once; duplicate keys reject the batch
    pub fn set_attributes<I>(&mut self, element: NodeId, attrs: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.clear_and_set(ListRef::attributes(element), attrs)
    }

    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<bool> {
        self.remove_attribute_ns(element, name, &Namespace::none())
    }

    pub fn remove_attribute_ns(
        &mut self,
        element: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<bool> {
        match self.attribute_ns(element, name, namespace)? {
            Some(id) => self.remove_node(ListRef::attributes(element), id),
            None => Ok(false),
        }
    }

    pub fn remove_attribute_node(&mut self, element: NodeId, attr: NodeId) -> Result<bool> {
        self.remove_node(ListRef::attributes(element), attr)
    }

    // ----- attribute side -----------------------------------------------

    pub fn set_attribute_value(&mut self, attr: NodeId, value: &str) -> Result<()> {
        verifier::check_character_data(value, "attribute value")?;
        self.attribute_data_mut(attr)?.value = value.to_string();
        Ok(())
    }

    pub fn set_attribute_type(
        &mut self,
        attr: NodeId,
        attribute_type: AttributeType,
    ) -> Result<()> {
        self.attribute_data_mut(attr)?.attribute_type = attribute_type;
        Ok(())
    }

    /// Rename an attribute. Fails if its element already holds the new key.
    pub fn set_attribute_name(&mut self, attr: NodeId, name: &str) -> Result<()> {
        verifier::check_attribute_name(name)?;
        let namespace = self.attribute_data(attr)?.namespace().clone();
        self.check_sibling_key(attr, name, &namespace)?;
        self.attribute_data_mut(attr)?.name = name.to_string();
        Ok(())
    }

    /// Move an attribute to another namespace. The key and prefix rules of
    /// its element still apply.
    pub fn set_attribute_namespace(&mut self, attr: NodeId, namespace: &Namespace) -> Result<()> {
        check_attribute_namespace(namespace)?;
        let name = self.attribute_data(attr)?.name().to_string();
        self.check_sibling_key(attr, &name, namespace)?;
        if let Some(element) = self.parent(attr)? {
            checker::check_attribute_prefix(self, element, namespace, Some(attr))?;
        }
        let namespace = self.intern(namespace)?;
        self.attribute_data_mut(attr)?.namespace = namespace;
        Ok(())
    }

    fn check_sibling_key(&self, attr: NodeId, name: &str, namespace: &Namespace) -> Result<()> {
        let Some(element) = self.parent(attr)? else {
            return Ok(());
        };
        for sibling in self.list(ListRef::attributes(element))?.iter() {
            if sibling != attr && self.attribute_data(sibling)?.has_key(name, namespace) {
                return Err(DomError::illegal_add(
                    attr,
                    element,
                    format!("An attribute \"{}\" already exists on the element", name),
                ));
            }
        }
        Ok(())
    }

    // ----- typed values -------------------------------------------------

    fn conversion_error(&self, attr: NodeId, target: &'static str) -> DomError {
        let name = self
            .attribute_data(attr)
            .map(|a| a.qualified_name())
            .unwrap_or_default();
        DomError::DataConversion { name, target }
    }

    pub fn int_value(&self, attr: NodeId) -> Result<i32> {
        self.attribute_data(attr)?
            .value()
            .trim()
            .parse()
            .map_err(|_| self.conversion_error(attr, "int"))
    }

    pub fn long_value(&self, attr: NodeId) -> Result<i64> {
        self.attribute_data(attr)?
            .value()
            .trim()
            .parse()
            .map_err(|_| self.conversion_error(attr, "long"))
    }

    pub fn float_value(&self, attr: NodeId) -> Result<f32> {
        let value = self.attribute_data(attr)?.value().trim();
        parse_decimal(value).ok_or_else(|| self.conversion_error(attr, "float"))
    }

    /// Like [`float_value`](Self::float_value), and also takes the schema
    /// spellings `INF` and `-INF`
    pub fn double_value(&self, attr: NodeId) -> Result<f64> {
        let value = self.attribute_data(attr)?.value().trim();
        let parsed = match value {
            "INF" => Some(f64::INFINITY),
            "-INF" => Some(f64::NEG_INFINITY),
            _ => parse_decimal(value),
        };
        parsed.ok_or_else(|| self.conversion_error(attr, "double"))
    }

    /// true/on/1/yes and false/off/0/no, any case
    pub fn boolean_value(&self, attr: NodeId) -> Result<bool> {
        let value = self.attribute_data(attr)?.value().trim();
        match value.to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Ok(true),
            "false" | "off" | "0" | "no" => Ok(false),
            _ => Err(self.conversion_error(attr, "boolean")),
        }
    }
}

/// Decimal notation plus the exact words `Infinity` and `NaN`. The looser
/// forms `str::parse` takes (`inf`, `nan` in any case) are refused.
fn parse_decimal<T: FromStr>(value: &str) -> Option<T> {
    let unsigned = value.strip_prefix(&['+', '-'][..]).unwrap_or(value);
    let numeric = unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if numeric || unsigned == "Infinity" || unsigned == "NaN" {
        value.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attribute_is_upsert_in_place() {
        let mut dom = XmlArena::new();
        let el = dom.new_element("e").unwrap();
        let a = dom.set_attribute(el, "a", "1").unwrap();
        let b = dom.set_attribute(el, "b", "2").unwrap();
        let mods = dom.list(ListRef::attributes(el)).unwrap().mod_count();

        let again = dom.set_attribute(el, "a", "changed").unwrap();
        assert_eq!(again, a);
        assert_eq!(dom.attribute_value(el, "a").unwrap(), Some("changed"));
        let attrs = dom.list(ListRef::attributes(el)).unwrap();
        assert_eq!(attrs.as_slice(), &[a, b]);
        assert_eq!(attrs.mod_count(), mods);
    }

    #[test]
    fn test_set_attribute_node_replaces_at_same_index() {
        let mut dom = XmlArena::new();
        let el = dom.new_element("e").unwrap();
        let a = dom.set_attribute(el, "a", "1").unwrap();
        let b = dom.set_attribute(el, "b", "2").unwrap();
        let replacement = dom.new_attribute("a", "new").unwrap();

        let old = dom.set_attribute_node(el, replacement).unwrap();
        assert_eq!(old, Some(a));
        assert_eq!(dom.parent(a).unwrap(), None);
        assert_eq!(
            dom.list(ListRef::attributes(el)).unwrap().as_slice(),
            &[replacement, b]
        );
    }

    #[test]
    fn test_positional_duplicate_rejected() {
        let mut dom = XmlArena::new();
        let el = dom.new_element("e").unwrap();
        dom.set_attribute(el, "a", "1").unwrap();
        let dup = dom.new_attribute("a", "2").unwrap();

        assert!(matches!(
            dom.insert_at(ListRef::attributes(el), 0, dup),
            Err(DomError::IllegalAdd { .. })
        ));
        assert_eq!(dom.parent(dup).unwrap(), None);
    }

    #[test]
    fn test_set_attributes_rejects_duplicate_batch() {
        let mut dom = XmlArena::new();
        let el = dom.new_element("e").unwrap();
        let keep = dom.set_attribute(el, "keep", "1").unwrap();
        let x1 = dom.new_attribute("x", "1").unwrap();
        let x2 = dom.new_attribute("x", "2").unwrap();

        assert!(dom.set_attributes(el, [x1, x2]).is_err());
        let attrs = dom.list(ListRef::attributes(el)).unwrap();
        assert_eq!(attrs.as_slice(), &[keep]);

        let old = dom.set_attributes(el, [x1]).unwrap();
        assert_eq!(old, vec![keep]);
        assert_eq!(dom.parent(keep).unwrap(), None);
    }

    #[test]
    fn test_namespaced_keys_compare_by_uri() {
        let mut dom = XmlArena::new();
        let p = dom.namespace("p", "urn:x").unwrap();
        let q = dom.namespace("q", "urn:x").unwrap();
        let el = dom.new_element("e").unwrap();
        let attr = dom.set_attribute_ns(el, "id", "1", &p).unwrap();

        assert_eq!(dom.attribute_ns(el, "id", &q).unwrap(), Some(attr));
        assert_eq!(dom.attribute(el, "id").unwrap(), None);
        // plain "id" is a different key
        dom.set_attribute(el, "id", "2").unwrap();
        assert_eq!(dom.list(ListRef::attributes(el)).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_attribute() {
        let mut dom = XmlArena::new();
        let el = dom.new_element("e").unwrap();
        let a = dom.set_attribute(el, "a", "1").unwrap();
        assert!(dom.remove_attribute(el, "a").unwrap());
        assert!(!dom.remove_attribute(el, "a").unwrap());
        assert_eq!(dom.parent(a).unwrap(), None);
        assert!(!dom.has_attributes(el).unwrap());
    }

    #[test]
    fn test_rename_checks_siblings() {
        let mut dom = XmlArena::new();
        let el = dom.new_element("e").unwrap();
        let a = dom.set_attribute(el, "a", "1").unwrap();
        dom.set_attribute(el, "b", "2").unwrap();

        assert!(dom.set_attribute_name(a, "b").is_err());
        dom.set_attribute_name(a, "c").unwrap();
        assert_eq!(dom.attribute_value(el, "c").unwrap(), Some("1"));
    }

    #[test]
    fn test_typed_values() {
        let mut dom = XmlArena::new();
        let n = dom.new_attribute("n", " 42 ").unwrap();
        let inf = dom.new_attribute("f", "-INF").unwrap();
        let yes = dom.new_attribute("b", "Yes").unwrap();
        let junk = dom.new_attribute("j", "maybe").unwrap();

        assert_eq!(dom.int_value(n).unwrap(), 42);
        assert_eq!(dom.long_value(n).unwrap(), 42);
        assert_eq!(dom.double_value(inf).unwrap(), f64::NEG_INFINITY);
        assert_eq!(dom.float_value(n).unwrap(), 42.0);
        assert!(dom.boolean_value(yes).unwrap());
        assert!(matches!(
            dom.boolean_value(junk),
            Err(DomError::DataConversion { target: "boolean", .. })
        ));
        assert!(dom.int_value(junk).is_err());
    }

    #[test]
    fn test_float_value_is_strict() {
        let mut dom = XmlArena::new();
        let values = ["INF", "inf", "nan", "1.5e2", "NaN", "-Infinity"];
        let ids: Vec<_> = values
            .iter()
            .map(|v| dom.new_attribute("f", v).unwrap())
            .collect();

        assert!(dom.float_value(ids[0]).is_err());
        assert!(dom.float_value(ids[1]).is_err());
        assert!(dom.float_value(ids[2]).is_err());
        assert_eq!(dom.float_value(ids[3]).unwrap(), 150.0);
        assert!(dom.float_value(ids[4]).unwrap().is_nan());
        assert_eq!(dom.float_value(ids[5]).unwrap(), f32::NEG_INFINITY);

        assert_eq!(dom.double_value(ids[0]).unwrap(), f64::INFINITY);
        assert!(dom.double_value(ids[1]).is_err());
    }

    #[test]
    fn test_rejected_attribute_allocates_nothing() {
        let mut dom = XmlArena::new();
        let p = dom.namespace("p", "urn:p").unwrap();
        let rebound = dom.namespace("p", "urn:other").unwrap();
        let el = dom.new_element_ns("e", &p).unwrap();
        let before = dom.len();

        assert!(matches!(
            dom.set_attribute_ns(el, "a", "1", &rebound),
            Err(DomError::IllegalAdd { .. })
        ));
        assert_eq!(dom.len(), before);
        assert!(!dom.has_attributes(el).unwrap());

        dom.set_attribute_ns(el, "a", "1", &p).unwrap();
        assert_eq!(dom.len(), before + 1);
    }

    #[test]
    fn test_namespace_change_checks_other_attributes() {
        let mut dom = XmlArena::new();
        let a_ns = dom.namespace("p", "urn:a").unwrap();
        let b_ns = dom.namespace("p", "urn:b").unwrap();
        let el = dom.new_element("e").unwrap();
        dom.set_attribute_ns(el, "x", "1", &a_ns).unwrap();
        let y = dom.set_attribute(el, "y", "2").unwrap();

        assert!(dom.set_attribute_namespace(y, &b_ns).is_err());
        let unchanged = dom.attribute_data(y).unwrap().namespace();
        assert!(unchanged.is_none());
        dom.set_attribute_namespace(y, &a_ns).unwrap();
        assert_eq!(dom.attribute_ns(el, "y", &a_ns).unwrap(), Some(y));
    }

    #[test]
    fn test_attribute_type() {
        let mut dom = XmlArena::new();
        let id = dom
            .new_attribute_typed("id", "x1", &Namespace::none(), AttributeType::Id)
            .unwrap();
        let kind = |dom: &XmlArena| dom.attribute_data(id).unwrap().attribute_type();
        assert_eq!(kind(&dom), AttributeType::Id);
        dom.set_attribute_type(id, AttributeType::CData).unwrap();
        assert_eq!(kind(&dom), AttributeType::CData);
    }
}
