use super::{ConfigParser, Gate, PortSource};
use crate::config::{
    identifier_index, is_clock, is_front_io, is_lemo_io, is_scaler, parse_frequency,
    AND_GATES_OFFSET, CLOCKS_OFFSET, DIVIDERS_OFFSET, DIVIDER_OR_GATES_OFFSET, OR_GATES_OFFSET,
    ZERO_VALUE_OFFSET,
};

fn compiler() -> ConfigParser {
    ConfigParser::new().unwrap()
}

fn gate(bits: &[usize]) -> Gate {
    bits.iter().copied().collect()
}

//-----------------------------------------------------------------------------
// identifier forms
//-----------------------------------------------------------------------------

#[test]
fn identifier_forms() {
    assert!(is_front_io("A0"));
    assert!(is_front_io("B31"));
    assert!(is_front_io("C15"));
    assert!(!is_front_io("A32"));
    assert!(!is_front_io("D0"));
    assert!(!is_front_io("A"));

    assert!(is_lemo_io("A16"));
    assert!(is_lemo_io("C31"));
    assert!(!is_lemo_io("A15"));

    assert!(is_scaler("S0"));
    assert!(is_scaler("S31"));
    assert!(!is_scaler("S32"));

    assert!(is_clock("clock_1Hz"));
    assert!(is_clock("clock_10kHz"));
    assert!(is_clock("clock_100MHz"));
    assert!(!is_clock("clock_Hz"));
    assert!(!is_clock("clock_10khz"));
}

#[test]
fn identifier_indices() {
    assert_eq!(identifier_index("A0"), Some(0));
    assert_eq!(identifier_index("A15"), Some(15));
    // the LEMO form shares its lane with the LVDS form
    assert_eq!(identifier_index("A16"), Some(0));
    assert_eq!(identifier_index("B0"), Some(16));
    assert_eq!(identifier_index("B13"), Some(29));
    assert_eq!(identifier_index("C0"), Some(32));
    assert_eq!(identifier_index("C31"), Some(47));
    assert_eq!(identifier_index("S4"), Some(223 + 4));
    assert_eq!(identifier_index("Back"), Some(113));
    assert_eq!(identifier_index("Extern"), Some(112));
    assert_eq!(identifier_index("clock_1Hz"), None);
}

#[test]
fn clock_frequencies() {
    assert_eq!(parse_frequency("clock_1Hz"), Some(1));
    assert_eq!(parse_frequency("clock_500Hz"), Some(500));
    assert_eq!(parse_frequency("clock_10kHz"), Some(10_000));
    assert_eq!(parse_frequency("clock_250MHz"), Some(250_000_000));
    assert_eq!(parse_frequency("A0"), None);
}

//-----------------------------------------------------------------------------
// allocation scenarios
//-----------------------------------------------------------------------------

#[test]
fn single_wire() {
    let mut parser = compiler();
    assert!(parser.parse("A1 = A0").ok());

    assert_eq!(parser.front_outputs(), &[PortSource { port: 1, source: 0 }]);
    assert!(parser.is_front_input(0));
    assert!(parser.is_front_output(1));
    assert!(parser.is_front_output_inverse(1));
    assert!(parser.or_gates().is_empty());
    assert!(parser.and_gates().is_empty());
}

#[test]
fn or_and_gates() {
    let mut parser = compiler();
    assert!(parser.parse("A13 = A3 | A7").ok());
    assert!(parser.parse("B13 = A3 & A7").ok());

    assert_eq!(parser.or_gates(), &[gate(&[3, 7])]);
    assert_eq!(parser.and_gates(), &[gate(&[3, 7])]);
    assert_eq!(
        parser.front_outputs(),
        &[
            PortSource { port: 13, source: OR_GATES_OFFSET },
            PortSource { port: 29, source: AND_GATES_OFFSET },
        ]
    );
}

#[test]
fn nested_gates() {
    let mut parser = compiler();
    assert!(parser.parse("A13 = A3 | A7").ok());
    assert!(parser.parse("B13 = A3 & A7").ok());
    assert!(parser.parse("A10 = (A3 | A7) & (B15 | B11)").ok());

    assert_eq!(parser.or_gates().len(), 2);
    assert_eq!(parser.or_gates()[1], gate(&[31, 27]));
    // the first AND slot holds `A3 & A7`, the new gate combines the OR gates
    assert_eq!(parser.and_gates().len(), 2);
    assert_eq!(
        parser.and_gates()[1],
        gate(&[OR_GATES_OFFSET, OR_GATES_OFFSET + 1])
    );
    assert_eq!(
        parser.front_outputs()[2],
        PortSource { port: 10, source: AND_GATES_OFFSET + 1 }
    );
}

#[test]
fn gate_deduplication() {
    let mut parser = compiler();
    assert!(parser.parse("A13 = A3 | A7").ok());
    assert!(parser.parse("B12 = A3 | A7").ok());

    assert_eq!(parser.or_gates().len(), 1);
    assert_eq!(parser.front_outputs()[0].source, OR_GATES_OFFSET);
    assert_eq!(parser.front_outputs()[1].source, OR_GATES_OFFSET);
}

#[test]
fn divider_allocation() {
    let mut parser = compiler();
    assert!(parser.parse("A2 = A0 / 10").ok());

    assert_eq!(parser.dividers().len(), 1);
    assert_eq!(parser.dividers()[0].source, 0);
    assert_eq!(parser.dividers()[0].divisor, 10);
    assert_eq!(
        parser.front_outputs(),
        &[PortSource { port: 2, source: DIVIDERS_OFFSET }]
    );
}

#[test]
fn divider_or_gate() {
    let mut parser = compiler();
    assert!(parser.parse("A2 = A0 / 10").ok());
    assert!(parser.parse("C5 = (A0 / 10) | (C0 / 100)").ok());

    // the first divider is shared, the second is new
    assert_eq!(parser.dividers().len(), 2);
    assert_eq!(parser.dividers()[1].source, 32);
    assert_eq!(parser.dividers()[1].divisor, 100);

    assert_eq!(parser.divider_or_gates().len(), 1);
    assert_eq!(
        parser.divider_or_gates()[0],
        gate(&[DIVIDERS_OFFSET, DIVIDERS_OFFSET + 1])
    );
    assert_eq!(
        parser.front_outputs()[1],
        PortSource { port: 37, source: DIVIDER_OR_GATES_OFFSET }
    );
}

#[test]
fn divider_and_gate_with_plain_operand() {
    let mut parser = compiler();
    assert!(parser.parse("B0 = (A0 / 100) & A1").ok());

    assert_eq!(parser.dividers().len(), 1);
    assert_eq!(parser.divider_and_gates().len(), 1);
    assert_eq!(parser.divider_and_gates()[0], gate(&[DIVIDERS_OFFSET, 1]));
    assert_eq!(parser.front_outputs()[0].source, 96);
}

#[test]
fn divider_of_gate_expression() {
    let mut parser = compiler();
    assert!(parser.parse("B0 = (A0 | A1) / 10").ok());

    // the divider observes an OR gate
    assert_eq!(parser.or_gates(), &[gate(&[0, 1])]);
    assert_eq!(parser.dividers().len(), 1);
    assert_eq!(parser.dividers()[0].source, OR_GATES_OFFSET);
    assert_eq!(parser.dividers()[0].divisor, 10);
    assert_eq!(parser.front_outputs()[0].source, DIVIDERS_OFFSET);
}

#[test]
fn constant_sources() {
    let mut parser = compiler();
    assert!(parser.parse("A5 = 1").ok());
    assert!(parser.parse("A6 = 0").ok());

    assert_eq!(parser.front_outputs()[0].source, ZERO_VALUE_OFFSET);
    assert_eq!(parser.front_outputs()[1].source, ZERO_VALUE_OFFSET);
    // only the constant 1 suppresses the output inversion
    assert!(!parser.is_front_output_inverse(5));
    assert!(parser.is_front_output_inverse(6));
}

#[test]
fn clock_sources() {
    let mut parser = compiler();
    assert!(parser.parse("A5 = clock_1MHz").ok());

    assert_eq!(parser.clocks(), &[1, 1_000_000]);
    assert_eq!(parser.second_clock(), Some(CLOCKS_OFFSET));
    assert_eq!(parser.front_outputs()[0].source, CLOCKS_OFFSET + 1);
    // a clock output is not inverted and declares no input
    assert!(!parser.is_front_output_inverse(5));
    assert!(!parser.is_front_input(5));

    // the same frequency reuses its slot
    assert!(parser.parse("A6 = clock_1MHz").ok());
    assert_eq!(parser.clocks().len(), 2);
}

#[test]
fn extern_clock_output() {
    let mut parser = compiler();
    let result = parser.parse("Extern = A0");
    assert_eq!(result.status(), 209);

    assert!(parser.parse("Extern = clock_10Hz").ok());
    assert_eq!(parser.clocks(), &[1, 10]);
    assert_eq!(parser.extern_clock(), Some(1));

    // a second source conflicts
    let result = parser.parse("Extern = clock_10Hz");
    assert_eq!(result.status(), 203);
}

#[test]
fn back_plane_output() {
    let mut parser = compiler();
    assert!(parser.parse("Back = A0 & A1").ok());
    assert_eq!(parser.back_source(), Some(AND_GATES_OFFSET));

    let result = parser.parse("Back = A2");
    assert_eq!(result.status(), 203);
}

//-----------------------------------------------------------------------------
// validation
//-----------------------------------------------------------------------------

#[test]
fn too_few_tokens() {
    let mut parser = compiler();
    assert_eq!(parser.parse("A0 =").status(), 201);
    assert_eq!(parser.parse("A0").status(), 201);
}

#[test]
fn invalid_token_forms() {
    let mut parser = compiler();
    // a scaler can not drive a port
    assert_eq!(parser.parse("A0 = S1").status(), 202);
    // a clock can only drive a front port or the external clock
    assert_eq!(parser.parse("Back = clock_1Hz").status(), 202);
    // bare literals other than 0/1
    assert_eq!(parser.parse("A0 = 5").status(), 202);
    assert_eq!(parser.parse("A0 = A1 & 5").status(), 202);
    // a clock name can not be a target
    assert_eq!(parser.parse("clock_1Hz = A0").status(), 202);
    // clocks can not feed gates
    assert_eq!(parser.parse("A0 = clock_1Hz & A1").status(), 202);
}

#[test]
fn output_conflicts() {
    let mut parser = compiler();
    assert!(parser.parse("A13 = A3").ok());
    let result = parser.parse("A13 = A5");
    assert_eq!(result.status(), 203);
    assert_eq!(result.position(), 0);
    assert_eq!(result.length(), 3);
}

#[test]
fn direction_conflicts() {
    let mut parser = compiler();
    assert!(parser.parse("A0 = A1").ok());
    // A1 is an input now, it can not become an output
    assert_eq!(parser.parse("A1 = A2").status(), 204);
    // A0 is an output now, it can not become an input
    assert_eq!(parser.parse("A2 = A0 & A3").status(), 204);
    // a port can not feed itself
    assert_eq!(parser.parse("A5 = A5 & A6").status(), 204);
}

#[test]
fn scaler_bindings() {
    let mut parser = compiler();
    // a scaler observes exactly one identifier
    assert_eq!(parser.parse("S0 = A0 | A1").status(), 205);
    assert_eq!(parser.parse("S0 = 1").status(), 205);

    assert!(parser.parse("S0 = A0").ok());
    assert_eq!(parser.scalers(), &[PortSource { port: 0, source: 0 }]);
    assert!(parser.is_scaler_used(0));
    // observing a port does not declare its direction
    assert!(!parser.is_front_input(0));

    // a scaler slot binds once
    assert_eq!(parser.parse("S0 = A1").status(), 203);

    // a scaler may observe an output port
    assert!(parser.parse("A1 = A2").ok());
    assert!(parser.parse("S3 = A1").ok());
}

#[test]
fn lemo_lvds_conflicts() {
    let mut parser = compiler();
    assert!(parser.parse("B0 = A16").ok());
    assert!(parser.is_front_input(0));
    assert!(parser.is_front_lemo(0));

    // lane 0 was bound as LEMO, the LVDS form conflicts
    let result = parser.parse("B1 = A0 & A2");
    assert_eq!(result.status(), 206);

    // and the other way round
    let mut parser = compiler();
    assert!(parser.parse("B0 = A0").ok());
    assert_eq!(parser.parse("B1 = A16 & A2").status(), 206);
}

#[test]
fn macro_variables() {
    let mut parser = compiler();
    assert!(parser.parse("trigger = A0 & A1").ok());

    // a definition allocates nothing and declares no directions
    assert!(parser.and_gates().is_empty());
    assert!(!parser.is_front_input(0));
    assert_eq!(parser.variables().len(), 1);
    assert_eq!(parser.variables()[0].name, "trigger");

    // a use expands to the parenthesized definition
    assert!(parser.parse("B5 = trigger | A2").ok());
    assert_eq!(parser.or_gates().len(), 2);
    assert_eq!(parser.or_gates()[0], gate(&[0, 2]));
    assert_eq!(parser.or_gates()[1], gate(&[1, 2]));
    assert_eq!(
        parser.and_gates(),
        &[gate(&[OR_GATES_OFFSET, OR_GATES_OFFSET + 1])]
    );
    assert_eq!(parser.front_outputs()[0].port, 21);

    // redefinition conflicts, unknown names are rejected
    assert_eq!(parser.parse("trigger = A5").status(), 203);
    assert_eq!(parser.parse("B6 = ghost | A2").status(), 207);
}

#[test]
fn macro_in_scaler_binding() {
    let mut parser = compiler();
    assert!(parser.parse("coincidence = A0 & A1").ok());
    assert!(parser.parse("S1 = coincidence").ok());

    assert_eq!(parser.and_gates(), &[gate(&[0, 1])]);
    assert_eq!(
        parser.scalers(),
        &[PortSource { port: 1, source: AND_GATES_OFFSET }]
    );
    // scaler reads never declare input direction
    assert!(!parser.is_front_input(0));
    assert!(!parser.is_front_input(1));
}

#[test]
fn nested_downscale_is_rejected() {
    let mut parser = compiler();
    assert_eq!(parser.parse("A0 = A1 / 5 / 3").status(), 208);
    assert_eq!(parser.parse("A0 = (A1 / 5) / 3").status(), 208);
    assert_eq!(parser.parse("A0 = (A1 / 5 | A2) / 3").status(), 208);
}

#[test]
fn zero_divisor_is_rejected() {
    let mut parser = compiler();
    assert_eq!(parser.parse("A0 = A1 / 0").status(), 300);
    assert!(parser.dividers().is_empty());
}

//-----------------------------------------------------------------------------
// pools, rollback and replay
//-----------------------------------------------------------------------------

#[test]
fn or_pool_exhaustion_rolls_back() {
    let mut parser = compiler();
    // fill all sixteen OR slots with distinct pairs
    for (index, pair) in [
        "A0 | A1", "A0 | A2", "A0 | A3", "A0 | A4", "A0 | A5", "A0 | A6", "A0 | A7", "A0 | A8",
        "A0 | A9", "A0 | A10", "A0 | A11", "A0 | A12", "A0 | A13", "A0 | A14", "A0 | A15",
        "A1 | A2",
    ]
    .iter()
    .enumerate()
    {
        let line = format!("B{} = {}", index, pair);
        assert!(parser.parse(&line).ok(), "line {} failed", line);
    }
    assert_eq!(parser.or_gates().len(), 16);

    // the seventeenth distinct gate does not fit
    let result = parser.parse("C1 = C10 | C11");
    assert_eq!(result.status(), 300);

    // nothing of the failing line sticks
    assert_eq!(parser.or_gates().len(), 16);
    assert_eq!(parser.front_outputs().len(), 16);
    assert_eq!(parser.expressions().len(), 16);
    assert!(!parser.is_front_input(42));
    assert!(!parser.is_front_input(43));
    assert!(!parser.is_front_output(33));
}

#[test]
fn clock_pool_exhaustion() {
    let mut parser = compiler();
    assert!(parser.parse("A0 = clock_10Hz").ok());
    assert!(parser.parse("A1 = clock_100Hz").ok());
    assert!(parser.parse("A2 = clock_1kHz").ok());
    // slot 0 is reserved for 1 Hz, so the fourth distinct frequency fails
    let result = parser.parse("A3 = clock_10kHz");
    assert_eq!(result.status(), 300);
    assert_eq!(parser.clocks().len(), 4);
}

#[test]
fn clear_reseeds_the_plan() {
    let mut parser = compiler();
    assert!(parser.parse("A13 = A3 | A7").ok());
    assert!(parser.parse("S0 = A3").ok());
    parser.clear();

    assert!(parser.front_outputs().is_empty());
    assert!(parser.or_gates().is_empty());
    assert!(parser.scalers().is_empty());
    assert!(parser.expressions().is_empty());
    assert_eq!(parser.clocks(), &[1]);
    assert!(!parser.is_front_input(3));
    assert!(!parser.is_front_output(13));
}

#[test]
fn replay_reproduces_the_plan() {
    let mut parser = compiler();
    let lines = [
        "veto = A4 & A5",
        "A13 = A3 | A7",
        "B13 = A3 & A7",
        "A2 = A0 / 10",
        "C5 = (A0 / 10) | (C0 / 100)",
        "B1 = veto | A6",
        "S7 = B5",
        "A8 = clock_100kHz",
        "Back = A3 & A6",
    ];
    for line in lines {
        assert!(parser.parse(line).ok(), "line failed: {}", line);
    }

    let front_outputs = parser.front_outputs().to_vec();
    let or_gates = parser.or_gates().to_vec();
    let and_gates = parser.and_gates().to_vec();
    let divider_or_gates = parser.divider_or_gates().to_vec();
    let dividers = parser.dividers().to_vec();
    let clocks = parser.clocks().to_vec();
    let scalers = parser.scalers().to_vec();
    let back = parser.back_source();
    let variables = parser.variables().to_vec();
    let expressions = parser.expressions().to_vec();
    assert_eq!(expressions.len(), lines.len());

    parser.clear();
    for line in &expressions {
        assert!(parser.parse(line).ok(), "replay failed: {}", line);
    }

    assert_eq!(parser.front_outputs(), front_outputs.as_slice());
    assert_eq!(parser.or_gates(), or_gates.as_slice());
    assert_eq!(parser.and_gates(), and_gates.as_slice());
    assert_eq!(parser.divider_or_gates(), divider_or_gates.as_slice());
    assert_eq!(parser.dividers(), dividers.as_slice());
    assert_eq!(parser.clocks(), clocks.as_slice());
    assert_eq!(parser.scalers(), scalers.as_slice());
    assert_eq!(parser.back_source(), back);
    assert_eq!(parser.variables(), variables.as_slice());
    assert_eq!(parser.expressions(), expressions.as_slice());
}

//-----------------------------------------------------------------------------
// files and diagnostics
//-----------------------------------------------------------------------------

#[test]
fn read_configuration_file() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logic.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "A13 = A3 | A7").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "B13 = A3 & A7").unwrap();
    drop(file);

    let mut parser = compiler();
    parser.read(&path).unwrap();
    assert_eq!(parser.front_outputs().len(), 2);
    assert_eq!(parser.expressions().len(), 2);
}

#[test]
fn read_stops_at_first_failure() {
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logic.txt");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "A13 = A3 | A7").unwrap();
    writeln!(file, "A13 = A5").unwrap();
    writeln!(file, "B0 = A1").unwrap();
    drop(file);

    let mut parser = compiler();
    let err = parser.read(&path).unwrap_err();
    match err {
        crate::ReadError::Parse {
            line_number,
            result,
            ..
        } => {
            assert_eq!(line_number, 2);
            assert_eq!(result.status(), 203);
        }
        other => panic!("unexpected error {:?}", other),
    }
    // lines before the failure are retained
    assert_eq!(parser.expressions().len(), 1);
}

#[test]
fn save_backup_writes_expressions() {
    let dir = tempfile::tempdir().unwrap();

    let mut parser = compiler();
    assert!(parser.parse("A13 = A3 | A7").ok());
    assert!(parser.parse("B13 = A3 & A7").ok());

    let stem = parser.save_backup_in(dir.path()).unwrap();
    let backup = std::fs::read_to_string(stem.with_extension("txt")).unwrap();
    assert_eq!(backup, "A13 = A3 | A7\nB13 = A3 & A7\n");

    let root = dir.path().join(".easy-config-logic");
    let log = std::fs::read_to_string(root.join("config-log.txt")).unwrap();
    assert!(log.contains("expression"));
    assert!(std::fs::read_to_string(root.join("last-config.txt"))
        .unwrap()
        .starts_with("0\n"));
}

#[test]
fn diagnostic_messages() {
    let mut parser = compiler();

    let line = "A0 = A1 / 5 / 3";
    let result = parser.parse(line);
    assert_eq!(result.status(), 208);
    let message = result.message(line);
    assert!(message.starts_with("[Error]"));
    assert!(message.contains("nested downscale"));

    let line = "_abc = A0";
    let result = parser.parse(line);
    assert_eq!(result.status(), 3);
    assert!(result.message(line).contains("underscore"));

    // success renders nothing
    let result = parser.parse("A1 = A0");
    assert!(result.ok());
    assert_eq!(result.message("A1 = A0"), "");
}
