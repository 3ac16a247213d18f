//! Minimal Wikibase entity model: enough to read an item's statements,
//! merge a new one, and serialize the changed statements for an edit.

use serde_json::{Map, Value, json};

use crate::error::{HarvestError, Result};

/// Value carried by a snak.
#[derive(Debug, Clone, PartialEq)]
pub enum SnakValue {
    /// Reference to another item, e.g. `Q42`.
    Item(String),
    String(String),
    /// Any other datavalue, kept as received.
    Other(Value),
}

impl SnakValue {
    fn from_datavalue(datavalue: &Value) -> Option<Self> {
        let value = datavalue.get("value")?;
        match datavalue.get("type").and_then(Value::as_str) {
            Some("wikibase-entityid") => {
                let id = value
                    .get("id")
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned)
                    .or_else(|| {
                        value
                            .get("numeric-id")
                            .and_then(Value::as_u64)
                            .map(|n| format!("Q{n}"))
                    })?;
                Some(Self::Item(id))
            }
            Some("string") => value.as_str().map(|s| Self::String(s.to_string())),
            _ => Some(Self::Other(datavalue.clone())),
        }
    }

    fn datatype(&self) -> Option<&'static str> {
        match self {
            Self::Item(_) => Some("wikibase-item"),
            Self::String(_) => Some("string"),
            Self::Other(_) => None,
        }
    }

    fn to_datavalue(&self) -> Value {
        match self {
            Self::Item(id) => {
                let mut value = json!({"entity-type": "item", "id": id});
                if let Some(n) = id.strip_prefix('Q').and_then(|n| n.parse::<u64>().ok()) {
                    value["numeric-id"] = json!(n);
                }
                json!({"value": value, "type": "wikibase-entityid"})
            }
            Self::String(s) => json!({"value": s, "type": "string"}),
            Self::Other(v) => v.clone(),
        }
    }
}

/// How a snak carries its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnakKind {
    #[default]
    Value,
    SomeValue,
    NoValue,
}

impl SnakKind {
    fn from_wire(snaktype: Option<&str>) -> Self {
        match snaktype {
            Some("somevalue") => Self::SomeValue,
            Some("novalue") => Self::NoValue,
            _ => Self::Value,
        }
    }

    fn as_wire(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::SomeValue => "somevalue",
            Self::NoValue => "novalue",
        }
    }
}

/// Property-value pair. `value` is `None` for `somevalue`/`novalue` snaks.
#[derive(Debug, Clone, PartialEq)]
pub struct Snak {
    pub property: String,
    pub kind: SnakKind,
    pub value: Option<SnakValue>,
}

impl Snak {
    pub fn new(property: impl Into<String>, value: SnakValue) -> Self {
        Self {
            property: property.into(),
            kind: SnakKind::Value,
            value: Some(value),
        }
    }

    fn from_json(v: &Value) -> Option<Self> {
        let property = v.get("property")?.as_str()?.to_string();
        let kind = SnakKind::from_wire(v.get("snaktype").and_then(Value::as_str));
        let value = match kind {
            SnakKind::Value => v.get("datavalue").and_then(SnakValue::from_datavalue),
            SnakKind::SomeValue | SnakKind::NoValue => None,
        };
        Some(Self { property, kind, value })
    }

    fn to_json(&self) -> Value {
        let mut snak = Map::new();
        snak.insert("property".into(), json!(self.property));
        match (&self.value, self.kind) {
            (Some(value), SnakKind::Value) => {
                snak.insert("snaktype".into(), json!("value"));
                snak.insert("datavalue".into(), value.to_datavalue());
                if let Some(datatype) = value.datatype() {
                    snak.insert("datatype".into(), json!(datatype));
                }
            }
            (None, SnakKind::Value) => {
                snak.insert("snaktype".into(), json!("somevalue"));
            }
            (_, kind) => {
                snak.insert("snaktype".into(), json!(kind.as_wire()));
            }
        }
        Value::Object(snak)
    }
}

/// Reads a `{property: [snak, ...]}` map, as used for qualifiers and reference snaks.
fn snaks_from_map(map: Option<&Value>) -> Vec<Snak> {
    map.and_then(Value::as_object)
        .map(|by_prop| {
            by_prop
                .values()
                .filter_map(Value::as_array)
                .flatten()
                .filter_map(Snak::from_json)
                .collect()
        })
        .unwrap_or_default()
}

/// Inverse of [`snaks_from_map`], returning the map and its property order.
fn snaks_to_map(snaks: &[Snak]) -> (Value, Vec<String>) {
    let mut by_prop: Map<String, Value> = Map::new();
    let mut order: Vec<String> = Vec::new();
    for snak in snaks {
        if !order.contains(&snak.property) {
            order.push(snak.property.clone());
        }
        let entry = by_prop
            .entry(snak.property.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(list) = entry {
            list.push(snak.to_json());
        }
    }
    (Value::Object(by_prop), order)
}

/// Order-insensitive comparison of two snak lists.
fn same_snaks(a: &[Snak], b: &[Snak]) -> bool {
    a.len() == b.len() && a.iter().all(|snak| b.contains(snak))
}

/// One reference block attached to a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reference {
    pub snaks: Vec<Snak>,
}

impl Reference {
    pub fn new(snaks: Vec<Snak>) -> Self {
        Self { snaks }
    }

    fn from_json(v: &Value) -> Self {
        Self {
            snaks: snaks_from_map(v.get("snaks")),
        }
    }

    fn to_json(&self) -> Value {
        let (snaks, order) = snaks_to_map(&self.snaks);
        json!({"snaks": snaks, "snaks-order": order})
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Rank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

impl Rank {
    fn from_wire(rank: Option<&str>) -> Self {
        match rank {
            Some("preferred") => Self::Preferred,
            Some("deprecated") => Self::Deprecated,
            _ => Self::Normal,
        }
    }

    fn as_wire(&self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::Normal => "normal",
            Self::Deprecated => "deprecated",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Server-assigned GUID; `None` until the statement has been written.
    pub id: Option<String>,
    pub mainsnak: Snak,
    pub qualifiers: Vec<Snak>,
    pub rank: Rank,
    pub references: Vec<Reference>,
}

impl Statement {
    pub fn new(mainsnak: Snak) -> Self {
        Self {
            id: None,
            mainsnak,
            qualifiers: Vec::new(),
            rank: Rank::Normal,
            references: Vec::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: Snak) -> Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn property(&self) -> &str {
        &self.mainsnak.property
    }

    /// Same main snak and the same qualifiers, in any order.
    fn same_claim(&self, other: &Statement) -> bool {
        self.mainsnak == other.mainsnak && same_snaks(&self.qualifiers, &other.qualifiers)
    }

    fn from_json(v: &Value) -> Option<Self> {
        Some(Self {
            id: v.get("id").and_then(Value::as_str).map(ToOwned::to_owned),
            mainsnak: Snak::from_json(v.get("mainsnak")?)?,
            qualifiers: snaks_from_map(v.get("qualifiers")),
            rank: Rank::from_wire(v.get("rank").and_then(Value::as_str)),
            references: v
                .get("references")
                .and_then(Value::as_array)
                .map(|refs| refs.iter().map(Reference::from_json).collect())
                .unwrap_or_default(),
        })
    }

    pub fn to_json(&self) -> Value {
        let mut statement = json!({
            "mainsnak": self.mainsnak.to_json(),
            "type": "statement",
            "rank": self.rank.as_wire(),
            "references": self.references.iter().map(Reference::to_json).collect::<Vec<_>>(),
        });
        if !self.qualifiers.is_empty() {
            let (qualifiers, order) = snaks_to_map(&self.qualifiers);
            statement["qualifiers"] = qualifiers;
            statement["qualifiers-order"] = json!(order);
        }
        if let Some(id) = &self.id {
            statement["id"] = json!(id);
        }
        statement
    }
}

/// What to do when an item already holds a statement for the same property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionIfExists {
    /// Replace a statement with the same main snak and qualifiers, keeping its ID and
    /// rank; otherwise append.
    AppendOrReplace,
    /// Always add a new statement.
    ForceAppend,
}

/// A knowledge-base item with its statements and the set of locally changed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    statements: Vec<Statement>,
    pending: Vec<usize>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            statements: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Parses one entity object as returned by `wbgetentities`.
    pub fn from_entity_json(entity: &Value) -> Result<Self> {
        if entity.get("missing").is_some() {
            let id = entity.get("id").and_then(Value::as_str).unwrap_or("?");
            return Err(HarvestError::ItemNotFound(id.to_string()));
        }
        let id = entity
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::Parse("entity without id".to_string()))?;

        let statements = entity
            .get("claims")
            .and_then(Value::as_object)
            .map(|claims| {
                claims
                    .values()
                    .filter_map(Value::as_array)
                    .flatten()
                    .filter_map(Statement::from_json)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id: id.to_string(),
            statements,
            pending: Vec::new(),
        })
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn statements_for<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a Statement> {
        self.statements.iter().filter(move |s| s.property() == property)
    }

    pub fn add_statement(&mut self, mut statement: Statement, action: ActionIfExists) {
        let existing = match action {
            ActionIfExists::AppendOrReplace => {
                self.statements.iter().position(|s| s.same_claim(&statement))
            }
            ActionIfExists::ForceAppend => None,
        };

        let index = match existing {
            Some(index) => {
                let current = &self.statements[index];
                statement.id = current.id.clone();
                statement.rank = current.rank.clone();
                self.statements[index] = statement;
                index
            }
            None => {
                self.statements.push(statement);
                self.statements.len() - 1
            }
        };
        if !self.pending.contains(&index) {
            self.pending.push(index);
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_statements(&self) -> impl Iterator<Item = &Statement> {
        self.pending.iter().filter_map(|&i| self.statements.get(i))
    }

    /// `data` payload for `wbeditentity` covering the changed statements.
    pub fn edit_payload(&self) -> Value {
        json!({
            "claims": self.pending_statements().map(Statement::to_json).collect::<Vec<_>>()
        })
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}
