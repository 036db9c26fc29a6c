use crate::types::{
    error::{DatabaseError, Result},
    value::{DataType, Value},
};

/// Row-level functions. Every one of them maps a NULL argument to NULL and
/// rejects non-text arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunction {
    Upper,
    Lower,
    Length,
    ConCat,
}

impl ScalarFunction {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Upper => "upper",
            ScalarFunction::Lower => "lower",
            ScalarFunction::Length => "length",
            ScalarFunction::ConCat => "concat",
        }
    }

    pub fn check_arity(&self, args: usize) -> Result<()> {
        let ok = match self {
            ScalarFunction::ConCat => args >= 2,
            _ => args == 1,
        };
        if ok {
            return Ok(());
        }
        let expected = match self {
            ScalarFunction::ConCat => "at least 2",
            _ => "exactly 1",
        };
        Err(DatabaseError::config(format!(
            "{}() takes {} argument(s), got {}",
            self.name(),
            expected,
            args
        )))
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        self.check_arity(args.len())
            .map_err(|e| DatabaseError::ExecutionError {
                details: e.to_string(),
            })?;
        if args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }

        match self {
            ScalarFunction::Upper => Ok(Value::Text(self.text_arg(&args[0])?.to_uppercase())),
            ScalarFunction::Lower => Ok(Value::Text(self.text_arg(&args[0])?.to_lowercase())),
            ScalarFunction::Length => {
                let len = self.text_arg(&args[0])?.chars().count();
                Ok(Value::Int(len as i32))
            }
            ScalarFunction::ConCat => {
                let mut out = String::new();
                for arg in args {
                    out.push_str(self.text_arg(arg)?);
                }
                Ok(Value::Text(out))
            }
        }
    }

    fn text_arg<'v>(&self, value: &'v Value) -> Result<&'v str> {
        value.as_text().ok_or_else(|| {
            DatabaseError::type_mismatch(
                format!("{}()", self.name()),
                DataType::Text.to_string(),
                value.data_type().to_string(),
            )
        })
    }
}
