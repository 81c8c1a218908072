//! Keva opcode extraction (spec §6). The core never executes a script; it
//! only recognizes the fixed push-then-drop shape a keva operation takes
//! in an already-validated output script and pulls the operand pushes out
//! of it. Ported from the structure of `CKevaScript`'s constructor
//! (`original_source/src/script/keva.cpp`), restated as a pure function
//! over raw bytes instead of a `CScript` iterator.

const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_DROP: u8 = 0x75;
const OP_2DROP: u8 = 0x6d;
const OP_NOP: u8 = 0x61;

/// Keva operation opcodes. These sit outside the standard Bitcoin-lineage
/// opcode space used by `OP_DROP`/`OP_2DROP`/`OP_NOP` above; the exact
/// byte values are a wire-format choice of the script layer (out of this
/// core's scope per spec §1) and are fixed here only so the parser below
/// has something concrete to match against.
pub const OP_KEVA_NAMESPACE: u8 = 0xd1;
pub const OP_KEVA_PUT: u8 = 0xd2;
pub const OP_KEVA_DELETE: u8 = 0xd3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KevaOp {
    Namespace { namespace: Vec<u8>, display_name: Vec<u8> },
    Put { namespace: Vec<u8>, key: Vec<u8>, value: Vec<u8> },
    Delete { namespace: Vec<u8>, key: Vec<u8> },
}

/// The keva operation together with the address script that follows its
/// push-then-drop header — the part of the output a spender must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKevaScript {
    pub op: KevaOp,
    pub address_script: Vec<u8>,
}

/// Recognizes a keva operation at the start of `script`. Returns `None`
/// for anything that is not a well-formed keva header — this is a
/// recognition query, not a validation step, so a non-match is never an
/// error (spec §6: "Any other shape is 'not a keva op' — not an error").
pub fn parse_keva_script(script: &[u8]) -> Option<ParsedKevaScript> {
    let mut pos = 0usize;
    let name_op = *script.get(pos)?;
    pos += 1;

    let mut args: Vec<Vec<u8>> = Vec::new();
    let terminator_start;
    loop {
        let opcode = *script.get(pos)?;
        if opcode == OP_DROP || opcode == OP_2DROP || opcode == OP_NOP {
            terminator_start = pos;
            break;
        }
        let (data, consumed) = read_push(&script[pos..])?;
        args.push(data);
        pos += consumed;
    }

    // Consume a run of terminator opcodes, mirroring the original's
    // "move past any DROP/2DROP/NOP" loop — a well-formed header uses
    // exactly the count its op requires, but trailing NOPs are tolerated.
    let mut address_start = terminator_start;
    while let Some(&opcode) = script.get(address_start) {
        if opcode == OP_DROP || opcode == OP_2DROP || opcode == OP_NOP {
            address_start += 1;
        } else {
            break;
        }
    }

    let op = match name_op {
        OP_KEVA_PUT if args.len() == 3 => {
            let value = args.pop().unwrap();
            let key = args.pop().unwrap();
            let namespace = args.pop().unwrap();
            KevaOp::Put { namespace, key, value }
        }
        OP_KEVA_DELETE if args.len() == 2 => {
            let key = args.pop().unwrap();
            let namespace = args.pop().unwrap();
            KevaOp::Delete { namespace, key }
        }
        OP_KEVA_NAMESPACE if args.len() == 2 => {
            let display_name = args.pop().unwrap();
            let namespace = args.pop().unwrap();
            KevaOp::Namespace { namespace, display_name }
        }
        _ => return None,
    };

    Some(ParsedKevaScript { op, address_script: script[address_start..].to_vec() })
}

/// Reads one push opcode at the start of `data`: direct pushes
/// (`0x01..=0x4b`), the empty push (`0x00`), and the three `PUSHDATA`
/// variants. Returns `None` for anything else — a non-push opcode before
/// the terminator invalidates the header, just as in the original parser.
fn read_push(data: &[u8]) -> Option<(Vec<u8>, usize)> {
    let opcode = *data.first()?;
    match opcode {
        0x00 => Some((Vec::new(), 1)),
        1..=0x4b => {
            let len = opcode as usize;
            let payload = data.get(1..1 + len)?;
            Some((payload.to_vec(), 1 + len))
        }
        OP_PUSHDATA1 => {
            let len = *data.get(1)? as usize;
            let payload = data.get(2..2 + len)?;
            Some((payload.to_vec(), 2 + len))
        }
        OP_PUSHDATA2 => {
            let len_bytes = data.get(1..3)?;
            let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
            let payload = data.get(3..3 + len)?;
            Some((payload.to_vec(), 3 + len))
        }
        OP_PUSHDATA4 => {
            let len_bytes = data.get(1..5)?;
            let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
            let payload = data.get(5..5 + len)?;
            Some((payload.to_vec(), 5 + len))
        }
        _ => None,
    }
}
