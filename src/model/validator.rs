//! Field validators run by insert and update, in declaration order.

use {
    crate::{
        database::BoxFuture,
        error::{Error, ValidationError},
        query::{where_eq, where_not_eq, Opt},
        types::{Row, Value},
    },
    std::fmt,
};

/// What a validator sees: the field under test, the record being written,
/// the primary key value of the row being updated, and the model.
pub struct ValidationContext<'a> {
    pub field: &'a str,
    pub row: &'a Row,
    pub primary: Option<&'a Value>,
    pub model: &'a dyn ModelRef,
}

impl ValidationContext<'_> {
    pub fn value(&self) -> Option<&Value> {
        self.row.get(self.field)
    }
}

/// The parts of a model a validator may query.
pub trait ModelRef: Send + Sync {
    fn table(&self) -> &str;

    fn primary_key(&self) -> &str;

    fn count(&self, options: Vec<Opt>) -> BoxFuture<'_, Result<u64, Error>>;
}

pub trait Validator: Send + Sync {
    fn validate<'a>(&'a self, ctx: &'a ValidationContext<'a>) -> BoxFuture<'a, Result<(), Error>>;
}

fn present(value: Option<&Value>) -> bool {
    value.is_some_and(|x| !x.is_zero())
}

macro_rules! with_message {
    ($($name:ident => $default:literal),* $(,)?) => {
        $(
            impl $name {
                /// Replaces the default failure message.
                pub fn message(mut self, message: impl Into<String>) -> Self {
                    self.message = Some(message.into());
                    self
                }

                fn fail(&self, field: &str) -> Error {
                    let message = match &self.message {
                        Some(message) => message.clone(),
                        None => format!($default, field),
                    };
                    ValidationError::new(field, message).into()
                }
            }
        )*
    };
}

/// The field must be present and not a zero value.
#[derive(Debug, Clone, Default)]
pub struct Required {
    message: Option<String>,
}

/// The field is required when `other` is present and not a zero value.
#[derive(Debug, Clone)]
pub struct RequiredIf {
    other: String,
    message: Option<String>,
}

/// No other row may hold the same value. The row being updated is excluded.
#[derive(Debug, Clone, Default)]
pub struct Unique {
    message: Option<String>,
}

pub struct Rule<F> {
    check: F,
    message: Option<String>,
}

impl<F> fmt::Debug for Rule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

with_message!(
    Required => "{} is required",
    RequiredIf => "{} is required",
    Unique => "{} already exists",
);

impl<F> Rule<F> {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

pub fn required() -> Required {
    Required::default()
}

pub fn required_if(other: impl Into<String>) -> RequiredIf {
    RequiredIf {
        other: other.into(),
        message: None,
    }
}

pub fn unique() -> Unique {
    Unique::default()
}

/// Validator from a predicate over the context.
pub fn rule<F>(check: F) -> Rule<F>
where
    F: Fn(&ValidationContext<'_>) -> bool + Send + Sync,
{
    Rule {
        check,
        message: None,
    }
}

impl Validator for Required {
    fn validate<'a>(&'a self, ctx: &'a ValidationContext<'a>) -> BoxFuture<'a, Result<(), Error>> {
        let result = match present(ctx.value()) {
            true => Ok(()),
            false => Err(self.fail(ctx.field)),
        };
        Box::pin(async move { result })
    }
}

impl Validator for RequiredIf {
    fn validate<'a>(&'a self, ctx: &'a ValidationContext<'a>) -> BoxFuture<'a, Result<(), Error>> {
        let result = match present(ctx.row.get(&self.other)) && !present(ctx.value()) {
            true => Err(self.fail(ctx.field)),
            false => Ok(()),
        };
        Box::pin(async move { result })
    }
}

impl Validator for Unique {
    fn validate<'a>(&'a self, ctx: &'a ValidationContext<'a>) -> BoxFuture<'a, Result<(), Error>> {
        Box::pin(async move {
            let value = match ctx.value() {
                Some(value) if !value.is_null() => value.clone(),
                _ => return Ok(()),
            };
            let mut options = vec![where_eq(ctx.field, value)];
            if let Some(primary) = ctx.primary.filter(|x| !x.is_null()) {
                options.push(where_not_eq(ctx.model.primary_key(), primary.clone()));
            }
            match ctx.model.count(options).await? {
                0 => Ok(()),
                _ => Err(self.fail(ctx.field)),
            }
        })
    }
}

impl<F> Validator for Rule<F>
where
    F: Fn(&ValidationContext<'_>) -> bool + Send + Sync,
{
    fn validate<'a>(&'a self, ctx: &'a ValidationContext<'a>) -> BoxFuture<'a, Result<(), Error>> {
        let result = match (self.check)(ctx) {
            true => Ok(()),
            false => Err(ValidationError::new(
                ctx.field,
                self.message
                    .clone()
                    .unwrap_or_else(|| format!("{} is invalid", ctx.field)),
            )
            .into()),
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{query::Options, row},
        std::sync::Mutex,
    };

    #[derive(Default)]
    struct Counter {
        hits: u64,
        seen: Mutex<Vec<Options>>,
    }

    impl ModelRef for Counter {
        fn table(&self) -> &str {
            "user"
        }

        fn primary_key(&self) -> &str {
            "id"
        }

        fn count(&self, options: Vec<Opt>) -> BoxFuture<'_, Result<u64, Error>> {
            self.seen.lock().unwrap().push(Options::build(options));
            Box::pin(async move { Ok(self.hits) })
        }
    }

    fn message(result: Result<(), Error>) -> String {
        match result {
            Err(Error::Validation(error)) => error.message,
            x => panic!("expected a validation error, got {x:?}"),
        }
    }

    #[tokio::test]
    async fn required_fields() {
        let model = Counter::default();
        let row = row!("name" => "", "mail" => "a@b", "age" => 0);
        let ctx = |field| ValidationContext {
            field,
            row: &row,
            primary: None,
            model: &model,
        };

        assert!(required().validate(&ctx("mail")).await.is_ok());
        assert_eq!(
            message(required().validate(&ctx("name")).await),
            "name is required"
        );
        assert_eq!(
            message(required().message("who?").validate(&ctx("missing")).await),
            "who?"
        );
        assert!(required_if("age").validate(&ctx("name")).await.is_ok());
        assert_eq!(
            message(required_if("mail").validate(&ctx("name")).await),
            "name is required"
        );
    }

    #[tokio::test]
    async fn unique_excludes_current_row() {
        let model = Counter {
            hits: 1,
            ..Default::default()
        };
        let row = row!("mail" => "a@b");
        let primary = Value::Int(7);
        let ctx = ValidationContext {
            field: "mail",
            row: &row,
            primary: Some(&primary),
            model: &model,
        };
        assert_eq!(message(unique().validate(&ctx).await), "mail already exists");

        let seen = model.seen.lock().unwrap();
        let (sql, args) = crate::query::render_where(Default::default(), &seen[0].wheres);
        assert_eq!(sql, "`mail` = ? and `id` != ?");
        assert_eq!(args, [Value::from("a@b"), Value::Int(7)]);
    }

    #[tokio::test]
    async fn unique_skips_absent_field() {
        let model = Counter {
            hits: 1,
            ..Default::default()
        };
        let row = row!();
        let ctx = ValidationContext {
            field: "mail",
            row: &row,
            primary: None,
            model: &model,
        };
        assert!(unique().validate(&ctx).await.is_ok());
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closure_rule() {
        let model = Counter::default();
        let row = row!("age" => 15);
        let ctx = ValidationContext {
            field: "age",
            row: &row,
            primary: None,
            model: &model,
        };
        let adult = rule(|ctx: &ValidationContext<'_>| {
            ctx.value().and_then(|x| x.clone().parse::<u32>().ok()) >= Some(18)
        });
        assert_eq!(message(adult.validate(&ctx).await), "age is invalid");
        let adult = adult.message("too young");
        assert_eq!(message(adult.validate(&ctx).await), "too young");
    }
}
