//! Shared builders for simulator scenario tests. The POUs are
//! authored through the compiler front-end so that the scenarios
//! exercise the whole pipeline, source to scan.
#![allow(dead_code)]

use plx_analyzer::{PouBuilder, TypeEnvironment};
use plx_dsl::common::{ConstantKind, Pou, TypeRef};
use plx_dsl::time::DurationLiteral;

/// A motor starter with a five second on-delay.
pub fn motor_starter() -> Pou {
    PouBuilder::function_block("MotorStarter")
        .input("cmd", TypeRef::BOOL)
        .output("running", TypeRef::BOOL)
        .logic("self.running = delayed(self.cmd, seconds=5)\n")
        .build(&TypeEnvironment::new())
        .expect("motor starter compiles")
}

/// A valve supervisor that faults when feedback stays away for three
/// seconds after the open command.
pub fn valve_supervisor() -> Pou {
    PouBuilder::function_block("ValveSupervisor")
        .input("cmd_open", TypeRef::BOOL)
        .input("feedback", TypeRef::BOOL)
        .output("fault", TypeRef::BOOL)
        .logic("self.fault = delayed(self.cmd_open and not self.feedback, seconds=3)\n")
        .build(&TypeEnvironment::new())
        .expect("valve supervisor compiles")
}

/// A single-scan rising edge detector.
pub fn edge_detector() -> Pou {
    PouBuilder::function_block("EdgeDetector")
        .input("x", TypeRef::BOOL)
        .output("pulse", TypeRef::BOOL)
        .logic("self.pulse = rising(self.x)\n")
        .build(&TypeEnvironment::new())
        .expect("edge detector compiles")
}

/// A three step batch sequence: idle, fill, mix. The mixer runs for
/// thirty seconds before the chart returns to idle.
pub fn batch_sequence() -> Pou {
    PouBuilder::function_block("BatchSequence")
        .input("cmd_start", TypeRef::BOOL)
        .input("fill_done", TypeRef::BOOL)
        .output("mixer", TypeRef::BOOL)
        .declare(
            "mix_time",
            plx_analyzer::static_var(TypeRef::TIME)
                .with_initial(ConstantKind::duration(DurationLiteral::seconds(30))),
        )
        .static_("mix_timer", TypeRef::named("TON"))
        .chart(
            plx_analyzer::ChartBuilder::new()
                .initial_step_with_actions(
                    "idle",
                    "self.mixer = False\nself.mix_timer(IN=False, PT=self.mix_time)\n",
                )
                .step("fill")
                .step_with_actions(
                    "mix",
                    "self.mixer = True\nself.mix_timer(IN=True, PT=self.mix_time)\n",
                )
                .transition("idle", "fill", "self.cmd_start")
                .transition("fill", "mix", "self.fill_done")
                .transition("mix", "idle", "self.mix_timer.Q"),
        )
        .build(&TypeEnvironment::new())
        .expect("batch sequence compiles")
}
