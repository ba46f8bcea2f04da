//! Construction of operators by name from a resolved configuration.

use crate::{
    FpAdd, FpDiv, FpFormat, FpMult, InputIeee, IntAdder, IntMultiplier, LeadingDigit, LongAcc,
    LongAcc2Fp, LzocShifterSticky, OutputIeee, PolynomialEvaluator, PolynomialFormat,
    ShiftDirection, Shifter, Table, TableFunction,
};
use pipegen_config::ResolvedConfig;
use pipegen_core::{ArithmeticOperator, GenError, GenerationContext};
use pipegen_target::{load_target, Target, TargetError, TargetOptions};

/// Every operator the registry can build, with a one-line description.
const OPERATORS: [(&str, &str); 14] = [
    ("IntAdder", "pipelined integer adder (input_width)"),
    ("Shifter", "barrel shifter (input_width, max_shift, direction)"),
    (
        "LZOCShifterSticky",
        "leading zero/one counter with normalization (input_width, output_width, count)",
    ),
    ("IntMultiplier", "tiled integer multiplier (input_width, input_width_y)"),
    ("ReciprocalTable", "tabulated reciprocal on [1, 2) (input_width, output_width)"),
    ("SquareTable", "tabulated square on [0, 1) (input_width, output_width)"),
    ("FPAdd", "floating-point adder (we, wf)"),
    ("FPMult", "floating-point multiplier (we, wf, output_mantissa_width, accuracy)"),
    ("FPDiv", "floating-point divider (we, wf)"),
    ("LongAcc", "long fixed-point accumulator (we, wf, msb_acc, lsb_acc, max_msb_in)"),
    ("LongAcc2FP", "long accumulator read-out (we, wf, msb_acc, lsb_acc)"),
    ("InputIEEE", "IEEE-754 to tagged format conversion (we, wf)"),
    ("OutputIEEE", "tagged format to IEEE-754 conversion (we, wf)"),
    (
        "PolynomialEvaluator",
        "Horner polynomial evaluator (degree, input_width, coefficient_width, coefficient_lsb, output_lsb)",
    ),
];

/// Names and descriptions of the operators [`build_operator`] accepts.
pub fn operator_names() -> &'static [(&'static str, &'static str)] {
    &OPERATORS
}

/// Builds the target device described by `config`.
pub fn target_for(config: &ResolvedConfig) -> Result<Box<dyn Target>, TargetError> {
    let options = TargetOptions {
        pipeline: config.pipeline,
        clock_enable: config.clock_enable,
        recirculation: config.recirculation,
        ..TargetOptions::default()
    };
    load_target(
        &config.vendor,
        config.family.as_deref(),
        config.target_frequency_mhz,
        options,
    )
}

fn require<T>(value: Option<T>, parameter: &str, operator: &str) -> Result<T, GenError> {
    value.ok_or_else(|| GenError::config(parameter, format!("is required by {operator}")))
}

/// Generates the operator named in `config.operator.name`.
///
/// # Errors
///
/// Fails with a configuration error if the name is unknown, a parameter
/// the operator needs is missing, or a parameter is out of range.
pub fn build_operator(
    ctx: &mut GenerationContext,
    target: &dyn Target,
    config: &ResolvedConfig,
) -> Result<Box<dyn ArithmeticOperator>, GenError> {
    let params = &config.operator;
    let name = params.name.as_str();
    let delays = &params.input_delays;
    let win = || require(params.input_width, "input_width", name);
    let format = || {
        Ok::<_, GenError>(FpFormat::new(
            require(config.exponent_width, "exponent_width", name)?,
            require(config.mantissa_width, "mantissa_width", name)?,
        ))
    };

    let op: Box<dyn ArithmeticOperator> = match name {
        "IntAdder" => Box::new(IntAdder::new(ctx, target, win()?, delays)?),
        "Shifter" => {
            let text = require(params.direction.as_deref(), "direction", name)?;
            let direction = ShiftDirection::parse(text).ok_or_else(|| {
                GenError::config("direction", format!("expected left or right, got '{text}'"))
            })?;
            let max_shift = require(params.max_shift, "max_shift", name)?;
            Box::new(Shifter::new(ctx, target, win()?, max_shift, direction, delays)?)
        }
        "LZOCShifterSticky" => {
            let width = win()?;
            let text = params.count.as_deref().unwrap_or("zero");
            let digit = LeadingDigit::parse(text).ok_or_else(|| {
                GenError::config("count", format!("expected zero, one or dynamic, got '{text}'"))
            })?;
            let wout = params.output_width.unwrap_or(width);
            Box::new(LzocShifterSticky::new(ctx, target, width, wout, digit, delays)?)
        }
        "IntMultiplier" => {
            let wx = win()?;
            let wy = params.input_width_y.unwrap_or(wx);
            Box::new(IntMultiplier::new(ctx, target, wx, wy, delays)?)
        }
        "ReciprocalTable" | "SquareTable" => {
            let function = TableFunction::from_name(name)
                .ok_or_else(|| GenError::internal(format!("no table function for {name}")))?;
            let wout = require(params.output_width, "output_width", name)?;
            Box::new(Table::new(ctx, target, win()?, wout, function, delays)?)
        }
        "FPAdd" => Box::new(FpAdd::new(ctx, target, format()?, delays)?),
        "FPMult" => {
            let input = format()?;
            let output = FpFormat::new(
                params.output_exponent_width.unwrap_or(input.we),
                params.output_mantissa_width.unwrap_or(input.wf),
            );
            Box::new(FpMult::new(
                ctx,
                target,
                input,
                output,
                config.accuracy_mode,
                delays,
            )?)
        }
        "FPDiv" => Box::new(FpDiv::new(ctx, target, format()?, delays)?),
        "LongAcc" => Box::new(LongAcc::new(
            ctx,
            target,
            format()?,
            require(params.msb_acc, "msb_acc", name)?,
            require(params.lsb_acc, "lsb_acc", name)?,
            require(params.max_msb_in, "max_msb_in", name)?,
            delays,
        )?),
        "LongAcc2FP" => Box::new(LongAcc2Fp::new(
            ctx,
            target,
            format()?,
            require(params.msb_acc, "msb_acc", name)?,
            require(params.lsb_acc, "lsb_acc", name)?,
            delays,
        )?),
        "InputIEEE" => Box::new(InputIeee::new(ctx, target, format()?, delays)?),
        "OutputIEEE" => Box::new(OutputIeee::new(ctx, target, format()?, delays)?),
        "PolynomialEvaluator" => {
            let format = PolynomialFormat {
                degree: require(params.degree, "degree", name)?,
                y_width: win()?,
                coefficient_width: require(params.coefficient_width, "coefficient_width", name)?,
                coefficient_lsb: require(params.coefficient_lsb, "coefficient_lsb", name)?,
                output_lsb: require(params.output_lsb, "output_lsb", name)?,
            };
            Box::new(PolynomialEvaluator::new(ctx, target, format, delays)?)
        }
        _ => {
            return Err(GenError::config(
                "operator.name",
                format!("unknown operator '{name}' (run `pipegen list`)"),
            ))
        }
    };
    Ok(op)
}
