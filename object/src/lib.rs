mod value;

pub use value::{CodeAddr, DataType, ObjectId, PropId, StringFactory, Value};

#[cfg(test)]
mod tests {
    use super::*;

    // ── Value ──────────────────────────────────────────────────────

    #[test]
    fn default_is_nil() {
        assert_eq!(Value::default(), Value::Nil);
        assert!(Value::default().is_nil());
    }

    #[test]
    fn from_bool_maps_to_true_and_nil() {
        assert_eq!(Value::from_bool(true), Value::True);
        assert_eq!(Value::from_bool(false), Value::Nil);
    }

    #[test]
    fn both_bifptr_encodings_decompose() {
        let a = Value::BifPtr { set_idx: 2, func_idx: 7 };
        let b = Value::BifPtrX { set_idx: 2, func_idx: 7 };
        assert_eq!(a.as_bifptr(), Some((2, 7)));
        assert_eq!(b.as_bifptr(), Some((2, 7)));
        assert_eq!(Value::Int(3).as_bifptr(), None);
    }

    #[test]
    fn datatype_codes() {
        assert_eq!(Value::Nil.datatype() as u8, 1);
        assert_eq!(Value::True.datatype() as u8, 2);
        assert_eq!(Value::Obj(ObjectId(9)).datatype() as u8, 5);
        assert_eq!(Value::Prop(PropId(1)).datatype() as u8, 6);
        assert_eq!(Value::Int(-4).datatype() as u8, 7);
        assert_eq!(Value::SString(0).datatype() as u8, 8);
        assert_eq!(Value::List(0).datatype() as u8, 10);
        assert_eq!(Value::CodeOfs(0).datatype() as u8, 11);
        assert_eq!(Value::FuncPtr(0).datatype() as u8, 12);
        assert_eq!(Value::BifPtrX { set_idx: 0, func_idx: 0 }.datatype() as u8, 16);
    }

    // ── ObjectId ───────────────────────────────────────────────────

    #[test]
    fn invalid_object_id() {
        assert!(!ObjectId::INVALID.is_valid());
        assert!(ObjectId(1).is_valid());
    }

    // ── CodeAddr ───────────────────────────────────────────────────

    #[test]
    fn code_addr_identity_follows_start_byte() {
        let buf = [0u8; 16];
        assert_eq!(CodeAddr::of(&buf[4..]), CodeAddr::of(&buf[4..8]));
        assert_ne!(CodeAddr::of(&buf[4..]), CodeAddr::of(&buf[5..]));
    }

    #[test]
    fn code_addr_offset_in_region() {
        let buf = [0u8; 16];
        let other = [0u8; 4];
        assert_eq!(CodeAddr::of(&buf[10..]).offset_in(&buf), Some(10));
        assert_eq!(CodeAddr::of(&buf).offset_in(&buf), Some(0));
        assert_eq!(CodeAddr::of(&other).offset_in(&buf), None);
    }
}
