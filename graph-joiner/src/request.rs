//! The request tree: which fields, and which sub-fields, were asked for.
use indexmap::IndexMap;
use serde::Serialize;

use crate::context::Context;
use crate::json_ext::ByteString;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// One node of the request tree.
///
/// A request selects `field_name` on its parent type with `args`. Its
/// `children` are keyed by response key (the alias if one was given, the
/// field name otherwise); a child without children of its own is a leaf
/// selection. `join_fields` names the fields this node must fetch for its
/// parent relationship to correlate rows, in the relationship's key order.
///
/// Requests are not modified once shared: derived requests are copies.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub(crate) field_name: ByteString,
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub(crate) args: Object,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub(crate) children: IndexMap<ByteString, Request>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) join_fields: Vec<ByteString>,
    #[serde(skip)]
    pub(crate) context: Context,
}

impl Request {
    /// A request selecting `field_name`, with no arguments and no children.
    pub fn new(field_name: impl Into<ByteString>) -> Self {
        Self {
            field_name: field_name.into(),
            args: Object::new(),
            children: IndexMap::new(),
            join_fields: Vec::new(),
            context: Context::default(),
        }
    }

    pub fn with_args(mut self, args: Object) -> Self {
        self.args = args;
        self
    }

    pub fn with_arg(mut self, name: impl Into<ByteString>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Adds `child` under the response key `key`.
    pub fn with_child(mut self, key: impl Into<ByteString>, child: Request) -> Self {
        self.children.insert(key.into(), child);
        self
    }

    /// Adds a leaf selection of `field_name`, keyed by its own name.
    pub fn with_field(self, field_name: &str) -> Self {
        self.with_child(field_name, Request::new(field_name))
    }

    /// Sets the context on this node and every descendant.
    pub fn with_context(mut self, context: Context) -> Self {
        self.set_context(&context);
        self
    }

    fn set_context(&mut self, context: &Context) {
        self.context = context.clone();
        for child in self.children.values_mut() {
            child.set_context(context);
        }
    }

    /// A copy of this request that must also fetch `join_fields`.
    pub(crate) fn with_join_fields(&self, join_fields: Vec<ByteString>) -> Self {
        Self {
            join_fields,
            ..self.clone()
        }
    }

    /// A flat copy of this request selecting exactly `children`.
    pub(crate) fn with_children(&self, children: IndexMap<ByteString, Request>) -> Self {
        Self {
            field_name: self.field_name.clone(),
            args: self.args.clone(),
            children,
            join_fields: self.join_fields.clone(),
            context: self.context.clone(),
        }
    }

    pub fn field_name(&self) -> &str {
        self.field_name.as_str()
    }

    pub fn args(&self) -> &Object {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    pub fn children(&self) -> &IndexMap<ByteString, Request> {
        &self.children
    }

    pub fn child(&self, key: &str) -> Option<&Request> {
        self.children.get(key)
    }

    /// The response keys of the requested fields.
    pub fn requested_keys(&self) -> impl Iterator<Item = &ByteString> {
        self.children.keys()
    }

    pub fn join_fields(&self) -> &[ByteString] {
        &self.join_fields
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Whether this request has no sub-selection.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Structural equality; the context is opaque and takes no part.
impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.field_name == other.field_name
            && self.args == other.args
            && self.children == other.children
            && self.join_fields == other.join_fields
    }
}
