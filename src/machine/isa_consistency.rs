//! Pins the instruction-set vocabulary.
//!
//! The population file format and the generation vocabulary both depend on
//! the opcode table staying put; this test fails loudly when an opcode, a
//! mnemonic, or an operand signature changes so the format version can be
//! bumped deliberately instead of silently.

#[cfg(test)]
mod tests {
    use crate::machine::isa::OpCode;

    #[test]
    fn opcode_table_is_pinned() {
        let table: Vec<(&str, &str)> = OpCode::ALL
            .iter()
            .map(|op| (op.mnemonic(), op.signature()))
            .collect();
        assert_eq!(
            table,
            vec![
                ("SET", "dst imm"),
                ("INC", "dst"),
                ("DEC", "dst"),
                ("READ", "dst src"),
                ("SWAP", "addr addr"),
                ("JLT", "val val offset"),
                ("JZ", "val offset"),
                ("JUMP", "offset"),
                ("LABEL", ""),
            ]
        );
    }

    #[test]
    fn mnemonics_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in OpCode::ALL {
            assert!(seen.insert(op.mnemonic()), "duplicate mnemonic {op}");
        }
    }
}
