//! Standard function block implementations: IEC 61131-3 timers, edge
//! detectors and counters.
//!
//! Each block executes one scan against its instance record. Record
//! keys are canonical lower case, like every instance record. Hidden
//! state lives in keys with a `__` prefix; those never collide with
//! interface variables. Timers read the virtual clock sampled at scan
//! start, so re-evaluation within a scan observes the same time.
use crate::value::{Record, Value};

/// One scan of the named standard block. `clock_ns` is the virtual
/// clock sample for the scan.
pub fn execute(type_name: &str, state: &mut Record, clock_ns: i64) {
    match type_name.to_lowercase().as_str() {
        "ton" => ton(state, clock_ns),
        "tof" => tof(state, clock_ns),
        "tp" => tp(state, clock_ns),
        "r_trig" => r_trig(state),
        "f_trig" => f_trig(state),
        "ctu" => ctu(state),
        "ctd" => ctd(state),
        other => unreachable!("not a standard block: {other}"),
    }
}

/// True when the name is a standard block this module implements.
pub fn is_builtin(type_name: &str) -> bool {
    matches!(
        type_name.to_lowercase().as_str(),
        "ton" | "tof" | "tp" | "r_trig" | "f_trig" | "ctu" | "ctd"
    )
}

/// The initial instance record of the named standard block.
pub fn initial_state(type_name: &str) -> Record {
    let mut state = Record::new();
    match type_name.to_lowercase().as_str() {
        "ton" | "tof" | "tp" => {
            state.insert("in".into(), Value::Bool(false));
            state.insert("pt".into(), Value::Duration(0));
            state.insert("q".into(), Value::Bool(false));
            state.insert("et".into(), Value::Duration(0));
        }
        "r_trig" | "f_trig" => {
            state.insert("clk".into(), Value::Bool(false));
            state.insert("q".into(), Value::Bool(false));
        }
        "ctu" => {
            state.insert("cu".into(), Value::Bool(false));
            state.insert("r".into(), Value::Bool(false));
            state.insert("pv".into(), Value::Int(0));
            state.insert("q".into(), Value::Bool(false));
            state.insert("cv".into(), Value::Int(0));
        }
        "ctd" => {
            state.insert("cd".into(), Value::Bool(false));
            state.insert("ld".into(), Value::Bool(false));
            state.insert("pv".into(), Value::Int(0));
            state.insert("q".into(), Value::Bool(false));
            state.insert("cv".into(), Value::Int(0));
        }
        other => unreachable!("not a standard block: {other}"),
    }
    state
}

fn get_bool(state: &Record, key: &str) -> bool {
    matches!(state.get(key), Some(Value::Bool(true)))
}

fn get_duration(state: &Record, key: &str) -> i64 {
    match state.get(key) {
        Some(Value::Duration(value)) => *value,
        _ => 0,
    }
}

fn get_int(state: &Record, key: &str) -> i64 {
    match state.get(key) {
        Some(Value::Int(value)) => *value,
        _ => 0,
    }
}

/// On-delay timer: `Q` rises once `IN` has been continuously true for
/// at least `PT` since its last false-to-true edge. `PT = 0` fires on
/// the same scan `IN` rises.
fn ton(state: &mut Record, clock_ns: i64) {
    let input = get_bool(state, "in");
    let preset = get_duration(state, "pt");

    if !input {
        state.insert("q".into(), Value::Bool(false));
        state.insert("et".into(), Value::Duration(0));
        state.remove("__started_at");
        return;
    }

    let started_at = match state.get("__started_at") {
        Some(Value::Duration(value)) => *value,
        _ => {
            state.insert("__started_at".into(), Value::Duration(clock_ns));
            clock_ns
        }
    };
    let elapsed = clock_ns - started_at;
    state.insert("et".into(), Value::Duration(elapsed.min(preset)));
    state.insert("q".into(), Value::Bool(elapsed >= preset));
}

/// Off-delay timer: `Q` holds true for `PT` after `IN` falls.
fn tof(state: &mut Record, clock_ns: i64) {
    let input = get_bool(state, "in");
    let preset = get_duration(state, "pt");
    let was_on = get_bool(state, "__was_on");

    if input {
        state.insert("q".into(), Value::Bool(true));
        state.insert("et".into(), Value::Duration(0));
        state.remove("__fell_at");
    } else {
        if was_on {
            state.insert("__fell_at".into(), Value::Duration(clock_ns));
        }
        match state.get("__fell_at") {
            Some(Value::Duration(fell_at)) => {
                let elapsed = clock_ns - *fell_at;
                state.insert("et".into(), Value::Duration(elapsed.min(preset)));
                state.insert("q".into(), Value::Bool(elapsed < preset));
            }
            _ => {
                state.insert("q".into(), Value::Bool(false));
                state.insert("et".into(), Value::Duration(0));
            }
        }
    }

    state.insert("__was_on".into(), Value::Bool(input));
}

/// Pulse timer: `Q` is true for exactly `PT` from a rising edge of
/// `IN`; the input has no effect while the pulse runs.
fn tp(state: &mut Record, clock_ns: i64) {
    let input = get_bool(state, "in");
    let preset = get_duration(state, "pt");
    let was_on = get_bool(state, "__was_on");

    match state.get("__pulse_started_at") {
        Some(Value::Duration(started_at)) => {
            let elapsed = clock_ns - *started_at;
            if elapsed >= preset {
                state.insert("q".into(), Value::Bool(false));
                state.insert("et".into(), Value::Duration(preset));
                state.remove("__pulse_started_at");
            } else {
                state.insert("q".into(), Value::Bool(true));
                state.insert("et".into(), Value::Duration(elapsed));
            }
        }
        _ => {
            if input && !was_on && preset > 0 {
                state.insert("__pulse_started_at".into(), Value::Duration(clock_ns));
                state.insert("q".into(), Value::Bool(true));
                state.insert("et".into(), Value::Duration(0));
            } else {
                state.insert("q".into(), Value::Bool(false));
                state.insert("et".into(), Value::Duration(0));
            }
        }
    }

    state.insert("__was_on".into(), Value::Bool(input));
}

/// Rising edge: `Q` is true for exactly one scan after CLK rises.
fn r_trig(state: &mut Record) {
    let clk = get_bool(state, "clk");
    let previous = get_bool(state, "__previous");
    state.insert("q".into(), Value::Bool(clk && !previous));
    state.insert("__previous".into(), Value::Bool(clk));
}

/// Falling edge: `Q` is true for exactly one scan after CLK falls.
fn f_trig(state: &mut Record) {
    let clk = get_bool(state, "clk");
    let previous = get_bool(state, "__previous");
    state.insert("q".into(), Value::Bool(!clk && previous));
    state.insert("__previous".into(), Value::Bool(clk));
}

/// Up counter: `CV` increments on rising edges of `CU` and clamps at
/// `PV`; reset dominates.
fn ctu(state: &mut Record) {
    let count_up = get_bool(state, "cu");
    let reset = get_bool(state, "r");
    let preset = get_int(state, "pv");
    let previous = get_bool(state, "__previous");
    let mut current = get_int(state, "cv");

    if reset {
        current = 0;
    } else if count_up && !previous && current < preset {
        current += 1;
    }

    state.insert("cv".into(), Value::Int(current));
    state.insert("q".into(), Value::Bool(current >= preset));
    state.insert("__previous".into(), Value::Bool(count_up));
}

/// Down counter: `CV` decrements on rising edges of `CD` and clamps
/// at zero; load dominates and sets `CV := PV`.
fn ctd(state: &mut Record) {
    let count_down = get_bool(state, "cd");
    let load = get_bool(state, "ld");
    let preset = get_int(state, "pv");
    let previous = get_bool(state, "__previous");
    let mut current = get_int(state, "cv");

    if load {
        current = preset;
    } else if count_down && !previous && current > 0 {
        current -= 1;
    }

    state.insert("cv".into(), Value::Int(current));
    state.insert("q".into(), Value::Bool(current <= 0));
    state.insert("__previous".into(), Value::Bool(count_down));
}
