use {
    super::Opt,
    crate::types::Value,
    std::{fmt, str::FromStr},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Like,
    NotLike,
    Between,
    FindInSet,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::Between => "between",
            Self::FindInSet => "find_in_set",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown operator {:?}", self.0)
    }
}

impl std::error::Error for UnknownOperator {}

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(match normalized.to_ascii_lowercase().as_str() {
            "=" => Self::Eq,
            "!=" | "<>" => Self::NotEq,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "<" => Self::Lt,
            "<=" => Self::Le,
            "in" => Self::In,
            "not in" => Self::NotIn,
            "like" => Self::Like,
            "not like" => Self::NotLike,
            "between" => Self::Between,
            "find_in_set" => Self::FindInSet,
            _ => return Err(UnknownOperator(s.to_owned())),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Operand {
    #[default]
    None,
    Value(Value),
    List(Vec<Value>),
}

/// One node of a WHERE clause.
///
/// A node either compares `field` with its operand, or, with an empty
/// `field`, groups the nodes in `group` in parentheses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Option<Operator>,
    pub operand: Operand,
    pub logic: Logic,
    pub group: Vec<Condition>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, operand: Operand, logic: Logic) -> Self {
        Self {
            field: field.into(),
            operator: Some(operator),
            operand,
            logic,
            group: Vec::new(),
        }
    }

    pub fn group(group: Vec<Condition>, logic: Logic) -> Self {
        Self {
            logic,
            group,
            ..Default::default()
        }
    }

    pub fn is_group(&self) -> bool {
        self.field.is_empty() && self.operator.is_none()
    }

    /// Nodes without a comparison and without children render nothing.
    pub fn is_empty(&self) -> bool {
        self.is_group() && self.group.iter().all(Condition::is_empty)
    }
}

fn list(values: impl IntoIterator<Item = impl Into<Value>>) -> Operand {
    Operand::List(values.into_iter().map(Into::into).collect())
}

fn wheres(options: impl IntoIterator<Item = Opt>) -> Vec<Condition> {
    let mut out = Vec::new();
    for option in options {
        option.collect_conditions(&mut out);
    }
    out
}

macro_rules! where_fns {
    ($($name:ident => $operator:ident),* $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("`field ", stringify!($name), " value`, joined with `and`.")]
                pub fn [<where_ $name>](field: impl Into<String>, value: impl Into<Value>) -> Opt {
                    Opt::Where(Condition::new(field, Operator::$operator, Operand::Value(value.into()), Logic::And))
                }

                #[doc = concat!("`field ", stringify!($name), " value`, joined with `or`.")]
                pub fn [<where_or_ $name>](field: impl Into<String>, value: impl Into<Value>) -> Opt {
                    Opt::Where(Condition::new(field, Operator::$operator, Operand::Value(value.into()), Logic::Or))
                }
            )*
        }
    };
}

where_fns!(
    eq => Eq,
    not_eq => NotEq,
    gt => Gt,
    ge => Ge,
    lt => Lt,
    le => Le,
    like => Like,
    not_like => NotLike,
    find_in_set => FindInSet,
);

macro_rules! where_list_fns {
    ($($name:ident => $operator:ident),* $(,)?) => {
        paste::paste! {
            $(
                pub fn [<where_ $name>](field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Opt {
                    Opt::Where(Condition::new(field, Operator::$operator, list(values), Logic::And))
                }

                pub fn [<where_or_ $name>](field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Opt {
                    Opt::Where(Condition::new(field, Operator::$operator, list(values), Logic::Or))
                }
            )*
        }
    };
}

where_list_fns!(in => In, not_in => NotIn);

pub fn where_between(field: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Opt {
    Opt::Where(Condition::new(
        field,
        Operator::Between,
        Operand::List(vec![from.into(), to.into()]),
        Logic::And,
    ))
}

pub fn where_or_between(
    field: impl Into<String>,
    from: impl Into<Value>,
    to: impl Into<Value>,
) -> Opt {
    Opt::Where(Condition::new(
        field,
        Operator::Between,
        Operand::List(vec![from.into(), to.into()]),
        Logic::Or,
    ))
}

/// Generic comparison, for operators chosen at runtime.
pub fn where_op(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Opt {
    let operand = match value.into() {
        Value::Json(serde_json::Value::Array(values))
            if matches!(operator, Operator::In | Operator::NotIn | Operator::Between) =>
        {
            Operand::List(values.into_iter().map(Value::from).collect())
        }
        value => Operand::Value(value),
    };
    Opt::Where(Condition::new(field, operator, operand, Logic::And))
}

/// Parenthesized group joined with `and`. Only the WHERE nodes of `options` are kept.
pub fn where_group(options: impl IntoIterator<Item = Opt>) -> Opt {
    Opt::Where(Condition::group(wheres(options), Logic::And))
}

/// Parenthesized group joined with `or`. Only the WHERE nodes of `options` are kept.
pub fn where_or_group(options: impl IntoIterator<Item = Opt>) -> Opt {
    Opt::Where(Condition::group(wheres(options), Logic::Or))
}
