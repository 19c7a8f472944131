use indexmap::IndexMap;

/// Value is a decoded wire value: a tree of ordered maps, lists, and scalars.
///
/// SOAP responses are decoded without consulting the service schema, so a
/// collection having a single member is indistinguishable from a nested
/// record, and all leaf values arrive as `Text`. Use [`Value::items`] to
/// read one-or-many collections and the `as_*` accessors to coerce scalars.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

/// Step is one component of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Property of a map.
    Key(String),
    /// Index of a list.
    Index(usize),
}

impl Step {
    fn parse(s: &str) -> Self {
        // Leading '+' or '0' (other than "0" itself) is a key, as with JSON pointers.
        if s.starts_with('+') || (s.starts_with('0') && s.len() > 1) {
            Step::Key(s.to_string())
        } else if let Ok(index) = s.parse::<usize>() {
            Step::Index(index)
        } else {
            Step::Key(s.to_string())
        }
    }
}

impl From<&str> for Step {
    fn from(key: &str) -> Self {
        Step::Key(key.to_string())
    }
}

impl From<usize> for Step {
    fn from(index: usize) -> Self {
        Step::Index(index)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Key(key) => write!(f, "{key}"),
            Step::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Path is an ordered sequence of steps into a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path(pub Vec<Step>);

impl Path {
    /// Parse a '/'-separated path, such as "Motoristas/0/CPF".
    /// Segments which are plain integers become index steps.
    ///
    /// ```
    /// use soap::value::{Path, Step};
    ///
    /// let path = Path::from_str("Motoristas/0/CPF");
    /// assert_eq!(
    ///     path.0,
    ///     vec![
    ///         Step::Key("Motoristas".to_string()),
    ///         Step::Index(0),
    ///         Step::Key("CPF".to_string()),
    ///     ]
    /// );
    /// ```
    pub fn from_str(s: &str) -> Path {
        Path(
            s.split('/')
                .filter(|segment| !segment.is_empty())
                .map(Step::parse)
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.0.iter()
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::from_str(s)
    }
}

impl From<&[Step]> for Path {
    fn from(steps: &[Step]) -> Self {
        Path(steps.to_vec())
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (ind, step) in self.0.iter().enumerate() {
            if ind != 0 {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// A scalar whose text could not be read as the requested number type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{text:?} is not a valid {expected}")]
pub struct NotANumber {
    pub text: String,
    pub expected: &'static str,
}

impl Value {
    /// Query the value at `path`. Returns None if the path leads through
    /// a Null, a missing key, an out-of-range index, or a step which doesn't
    /// apply to the current value (a key of a list, an index of a map, or
    /// any step of a scalar).
    pub fn at<P: Into<Path>>(&self, path: P) -> Option<&Value> {
        self.at_path(&path.into())
    }

    pub fn at_path(&self, path: &Path) -> Option<&Value> {
        let mut node = self;

        for step in path.iter() {
            node = match (node, step) {
                (Value::Map(fields), Step::Key(key)) => fields.get(key)?,
                (Value::List(items), Step::Index(index)) => items.get(*index)?,
                _ => return None,
            };
        }

        if node.is_null() { None } else { Some(node) }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, empty text, and empty collections are all "empty".
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(fields) => fields.is_empty(),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => false,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Render a scalar as text. Collections and Null have no text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text.clone()),
            Value::Int(n) => Some(n.to_string()),
            Value::Float(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Read a scalar as a float. Empty text is None.
    pub fn as_f64(&self) -> Result<Option<f64>, NotANumber> {
        match self {
            Value::Float(n) => Ok(Some(*n)),
            Value::Int(n) => Ok(Some(*n as f64)),
            Value::Text(text) if text.trim().is_empty() => Ok(None),
            Value::Text(text) => text
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| NotANumber {
                    text: text.clone(),
                    expected: "float",
                }),
            _ => Ok(None),
        }
    }

    /// Read a scalar as an integer. Empty text is None.
    pub fn as_i64(&self) -> Result<Option<i64>, NotANumber> {
        match self {
            Value::Int(n) => Ok(Some(*n)),
            Value::Float(n) if n.fract() == 0.0 => Ok(Some(*n as i64)),
            Value::Text(text) if text.trim().is_empty() => Ok(None),
            Value::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| NotANumber {
                    text: text.clone(),
                    expected: "integer",
                }),
            Value::Float(_) => Err(NotANumber {
                text: self.as_text().unwrap_or_default(),
                expected: "integer",
            }),
            _ => Ok(None),
        }
    }

    /// Members of a one-or-many collection.
    ///
    /// Wire collections are sometimes wrapped under a key named for their
    /// element type (`{"Produto": [...]}`), and sometimes bare lists. Under
    /// the wrapper, a list yields its elements and a lone record yields
    /// itself. Otherwise only a bare list has members: a map without the
    /// wrapper key, a scalar, or Null yields nothing.
    pub fn items<'v>(&'v self, wrapper: &str) -> Vec<&'v Value> {
        match self {
            Value::Map(fields) => match fields.get(wrapper) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::List(items)) => items.iter().filter(|item| !item.is_null()).collect(),
                Some(other) => vec![other],
            },
            Value::List(items) => items.iter().filter(|item| !item.is_null()).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(n) => Value::Int(n),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::Text(text) => serializer.serialize_str(text),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(fields) => serializer.collect_map(fields),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "NumeroCarga": "123",
            "Veiculo": {"Placa": "ABC1D23", "TipoVeiculo": null},
            "Motoristas": {"Motorista": [{"CPF": "111", "Nome": "Ana"}]},
            "Produtos": [{"CodigoProduto": "A"}, {"CodigoProduto": "B"}],
            "Vazio": {},
        })
        .into()
    }

    #[test]
    fn test_path_parsing() {
        assert_eq!(
            Path::from_str("/a/0/01/+1/b").0,
            vec![
                Step::Key("a".to_string()),
                Step::Index(0),
                Step::Key("01".to_string()),
                Step::Key("+1".to_string()),
                Step::Key("b".to_string()),
            ]
        );
        assert_eq!(Path::from_str("").0, Vec::new());
        assert_eq!(Path::from_str("a/3/b").to_string(), "a/3/b");
    }

    #[test]
    fn test_lookups() {
        let doc = fixture();

        assert_eq!(doc.at("NumeroCarga"), Some(&Value::from("123")));
        assert_eq!(doc.at("Veiculo/Placa"), Some(&Value::from("ABC1D23")));
        assert_eq!(
            doc.at("Motoristas/Motorista/0/Nome"),
            Some(&Value::from("Ana"))
        );
        assert_eq!(
            doc.at("Produtos/1/CodigoProduto"),
            Some(&Value::from("B"))
        );
        // The empty path is the root itself.
        assert_eq!(doc.at(""), Some(&doc));
    }

    #[test]
    fn test_lookups_degrade_to_absent() {
        let doc = fixture();

        for path in [
            "Missing",
            "Veiculo/TipoVeiculo",         // Explicit null.
            "Veiculo/TipoVeiculo/Deeper",  // Step through null.
            "NumeroCarga/0",               // Index of a scalar.
            "NumeroCarga/Key",             // Key of a scalar.
            "Motoristas/0/CPF",            // Index of a map.
            "Produtos/CodigoProduto",      // Key of a list.
            "Produtos/2",                  // Out of range.
            "Produtos/18446744073709551615",
            "Vazio/Anything",
        ] {
            assert_eq!(doc.at(path), None, "path {path}");
        }

        // Every path of a scalar or null root is absent.
        for root in [Value::Null, Value::from("x"), Value::Int(1)] {
            assert_eq!(root.at("a/0/b"), None);
            assert_eq!(root.at("0"), None);
        }
    }

    #[test]
    fn test_steps_from_slices() {
        let doc = fixture();
        let steps = [Step::from("Produtos"), Step::from(0), Step::from("CodigoProduto")];
        assert_eq!(doc.at(&steps[..]), Some(&Value::from("A")));
    }

    #[test]
    fn test_one_or_many_items() {
        let doc = fixture();

        let wrapped = doc.at("Motoristas").unwrap().items("Motorista");
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].at("CPF"), Some(&Value::from("111")));

        let bare = doc.at("Produtos").unwrap().items("Produto");
        assert_eq!(bare.len(), 2);

        // A lone record under the wrapper is a single member.
        let single: Value = json!({"Produto": {"CodigoProduto": "Z"}}).into();
        assert_eq!(single.items("Produto").len(), 1);

        let empty: Value = json!({"Produto": null}).into();
        assert!(empty.items("Produto").is_empty());
        assert!(Value::Null.items("Produto").is_empty());

        // A record without the wrapper key isn't a member of its own collection.
        let unwrapped: Value = json!({"CodigoProduto": "Z"}).into();
        assert!(unwrapped.items("Produto").is_empty());
        assert!(Value::from("Z").items("Produto").is_empty());
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(Value::from("12.5").as_f64(), Ok(Some(12.5)));
        assert_eq!(Value::from(" 7 ").as_i64(), Ok(Some(7)));
        assert_eq!(Value::from("").as_f64(), Ok(None));
        assert_eq!(Value::Int(3).as_f64(), Ok(Some(3.0)));
        assert_eq!(Value::Float(4.0).as_i64(), Ok(Some(4)));
        assert!(Value::from("abc").as_f64().is_err());
        assert!(Value::Float(4.5).as_i64().is_err());

        assert_eq!(Value::Int(42).as_text(), Some("42".to_string()));
        assert_eq!(Value::Bool(true).as_text(), Some("true".to_string()));
        assert_eq!(Value::List(Vec::new()).as_text(), None);
    }
}
