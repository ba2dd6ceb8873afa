//! Argument validation: converting the token stream into the typed argument
//! list a command handler receives.

use crate::context::Context;
use crate::error::{CommandError, TransformError};
use crate::module::{ArgValue, CommandSpec, ParamType, Transformer};
use async_trait::async_trait;
use stray_parse::{Bounds, Tokenizer, parse_bool, parse_i64};
use tracing::error;

/// Standard string transformer.
///
/// Consumes the next token (quote-aware unless disabled), or the whole
/// remaining text when `rest_of_string` is set.
#[derive(Debug, Clone, Copy)]
pub struct StringTransformer {
    /// Consume the remainder of the input instead of one token.
    pub rest_of_string: bool,
    /// Case-fold the produced value.
    pub lowercase: bool,
    /// Honor quoting when taking a single token.
    pub quoted: bool,
}

impl Default for StringTransformer {
    fn default() -> Self {
        Self {
            rest_of_string: false,
            lowercase: false,
            quoted: true,
        }
    }
}

impl StringTransformer {
    /// A transformer consuming the rest of the argument text.
    pub fn rest() -> Self {
        Self {
            rest_of_string: true,
            ..Self::default()
        }
    }

    /// A transformer that case-folds its value.
    pub fn lowercased() -> Self {
        Self {
            lowercase: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Transformer for StringTransformer {
    async fn transform(
        &self,
        _ctx: &mut Context,
        args: &mut Tokenizer,
    ) -> Result<ArgValue, TransformError> {
        let value = if self.rest_of_string {
            args.take_rest()
        } else {
            args.next_token(self.quoted)?
        };
        Ok(ArgValue::Str(if self.lowercase {
            value.to_lowercase()
        } else {
            value
        }))
    }
}

/// Standard number transformer: base-10 integer with optional bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberTransformer {
    /// Bounds and the clamp-or-reject policy applied to them.
    pub bounds: Bounds,
}

impl NumberTransformer {
    /// A transformer with the given bounds (default clamp policy).
    pub fn bounded(min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            bounds: Bounds::new(min, max),
        }
    }

    /// A transformer with explicit bounds configuration.
    pub fn with_bounds(bounds: Bounds) -> Self {
        Self { bounds }
    }
}

#[async_trait]
impl Transformer for NumberTransformer {
    async fn transform(
        &self,
        _ctx: &mut Context,
        args: &mut Tokenizer,
    ) -> Result<ArgValue, TransformError> {
        let token = args.next_token(true)?;
        let value = parse_i64(&token)?;
        Ok(ArgValue::Int(self.bounds.apply(value)?))
    }
}

/// Standard boolean transformer over the true/false word sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanTransformer;

#[async_trait]
impl Transformer for BooleanTransformer {
    async fn transform(
        &self,
        _ctx: &mut Context,
        args: &mut Tokenizer,
    ) -> Result<ArgValue, TransformError> {
        let token = args.next_token(false)?;
        Ok(ArgValue::Bool(parse_bool(&token)?))
    }
}

/// Validate the token stream against a command's declared parameters.
///
/// Returns `Ok(None)` for an authoring error (a `Custom` parameter with no
/// transformer): the invocation is silently dropped after logging, since
/// this is a developer mistake rather than bad user input. Running out of
/// tokens stops collection; it only becomes an error when fewer values were
/// collected than the command requires.
pub async fn validate_args(
    ctx: &mut Context,
    args: &mut Tokenizer,
    spec: &CommandSpec,
) -> Result<Option<Vec<ArgValue>>, CommandError> {
    let mut collected = Vec::new();

    for (index, param) in spec.params.iter().enumerate() {
        let result = match &param.transformer {
            Some(custom) => custom.transform(ctx, args).await,
            None => match param.ty {
                ParamType::Str => StringTransformer::default().transform(ctx, args).await,
                ParamType::Int => NumberTransformer::default().transform(ctx, args).await,
                ParamType::Bool => BooleanTransformer.transform(ctx, args).await,
                ParamType::Custom => {
                    error!(
                        command = %spec.name,
                        arg = index,
                        "custom parameter declared without a transformer"
                    );
                    return Ok(None);
                }
            },
        };

        match result {
            Ok(value) => collected.push(value),
            Err(TransformError::EndOfArgs(_)) => break,
            Err(source) => return Err(CommandError::Parse { arg: index, source }),
        }
    }

    let required = spec.required_count();
    if collected.len() < required {
        return Err(CommandError::InvalidArgCount {
            received: collected.len(),
            required,
        });
    }

    Ok(Some(collected))
}
