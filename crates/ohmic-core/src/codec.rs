//! Compact binary circuit format.
//!
//! All integers and floats are big-endian.
//!
//! ```text
//! magic "OHMC" | version u8 | tick rate f64 | element count u32
//! index width u8 | group count u32
//! group:   kind tag u16 | element count u32 | element*
//! element: index (width bytes) | name length u16 | name UTF-8
//!          | pin node ids u32* | parameters f64*
//! ```
//!
//! Elements are grouped by kind in order of first appearance; the index
//! restores the original order on decode. Only parameters are stored, so a
//! decoded circuit starts from a fresh simulation state.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::debug;

use crate::circuit::Circuit;
use crate::element::{Element, ElementKind};
use crate::error::{Error, Result};
use crate::ids::{ElementId, Node};

pub const MAGIC: &[u8; 4] = b"OHMC";
pub const VERSION: u8 = 1;

fn index_width(count: usize) -> u8 {
    if count <= usize::from(u8::MAX) {
        1
    } else if count <= usize::from(u16::MAX) {
        2
    } else {
        4
    }
}

fn length<T: TryFrom<usize>>(value: usize, what: &str) -> Result<T> {
    T::try_from(value).map_err(|_| Error::Codec(format!("{what} {value} does not fit the format")))
}

pub fn encode(circuit: &Circuit) -> Result<Bytes> {
    let elements = circuit.elements();
    let mut groups: Vec<(ElementKind, Vec<usize>)> = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        match groups.iter_mut().find(|(kind, _)| *kind == element.kind()) {
            Some((_, members)) => members.push(index),
            None => groups.push((element.kind(), vec![index])),
        }
    }

    let width = index_width(elements.len());
    let mut buf = BytesMut::new();
    buf.put_slice(MAGIC);
    buf.put_u8(VERSION);
    buf.put_f64(circuit.effective_tick_rate());
    buf.put_u32(length(elements.len(), "element count")?);
    buf.put_u8(width);
    buf.put_u32(length(groups.len(), "group count")?);

    for (kind, members) in &groups {
        buf.put_u16(kind.tag());
        buf.put_u32(length(members.len(), "group size")?);
        for &index in members {
            match width {
                1 => buf.put_u8(length(index, "index")?),
                2 => buf.put_u16(length(index, "index")?),
                _ => buf.put_u32(length(index, "index")?),
            }
            let name = circuit
                .name(ElementId::new(index))
                .unwrap_or_default();
            buf.put_u16(length(name.len(), "name length")?);
            buf.put_slice(name.as_bytes());

            let element = &elements[index];
            for pin in element.pins() {
                buf.put_u32(pin.id());
            }
            for value in element.component().params() {
                buf.put_f64(value);
            }
        }
    }

    debug!(
        "encoded {} elements in {} groups, {} bytes",
        elements.len(),
        groups.len(),
        buf.len()
    );
    Ok(buf.freeze())
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl Reader<'_> {
    fn need(&self, bytes: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < bytes {
            return Err(Error::Codec(format!(
                "truncated input while reading {what}: need {bytes} bytes, {} left",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        self.need(2, what)?;
        Ok(self.buf.get_u16())
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        self.need(4, what)?;
        Ok(self.buf.get_u32())
    }

    fn f64(&mut self, what: &str) -> Result<f64> {
        self.need(8, what)?;
        Ok(self.buf.get_f64())
    }

    fn bytes(&mut self, len: usize, what: &str) -> Result<Vec<u8>> {
        self.need(len, what)?;
        let mut out = vec![0; len];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    fn index(&mut self, width: u8) -> Result<usize> {
        let index = match width {
            1 => u32::from(self.u8("index")?),
            2 => u32::from(self.u16("index")?),
            _ => self.u32("index")?,
        };
        usize::try_from(index).map_err(|_| Error::Codec(format!("index {index} too large")))
    }
}

pub fn decode(input: &[u8]) -> Result<Circuit> {
    let mut reader = Reader { buf: input };
    if reader.bytes(MAGIC.len(), "magic")? != MAGIC {
        return Err(Error::Codec("not an ohmic circuit (bad magic)".into()));
    }
    let version = reader.u8("version")?;
    if version != VERSION {
        return Err(Error::Codec(format!("unsupported version {version}")));
    }
    let tick_rate = reader.f64("tick rate")?;
    let count = reader.u32("element count")? as usize;
    let width = reader.u8("index width")?;
    if !matches!(width, 1 | 2 | 4) {
        return Err(Error::Codec(format!("invalid index width {width}")));
    }
    let group_count = reader.u32("group count")?;
    if count > reader.buf.remaining() {
        return Err(Error::Codec(format!(
            "element count {count} exceeds the {} bytes left",
            reader.buf.remaining()
        )));
    }

    let mut slots: Vec<Option<(Option<String>, Element)>> = Vec::new();
    slots.resize_with(count, || None);

    for _ in 0..group_count {
        let tag = reader.u16("kind tag")?;
        let kind = ElementKind::from_tag(tag).ok_or(Error::UnknownElementTag(tag))?;
        let (pin_count, param_count) = kind.arity();
        let members = reader.u32("group size")?;

        for _ in 0..members {
            let index = reader.index(width)?;
            let name_len = usize::from(reader.u16("name length")?);
            let name = String::from_utf8(reader.bytes(name_len, "name")?)
                .map_err(|e| Error::Codec(format!("element name is not UTF-8: {e}")))?;

            let pins = (0..pin_count)
                .map(|_| reader.u32("pin").map(Node::new))
                .collect::<Result<Vec<_>>>()?;
            let params = (0..param_count)
                .map(|_| reader.f64("parameter"))
                .collect::<Result<Vec<_>>>()?;
            let element = Element::from_parts(kind, &pins, &params)?;

            let slot = slots
                .get_mut(index)
                .ok_or_else(|| Error::Codec(format!("element index {index} out of range")))?;
            if slot.is_some() {
                return Err(Error::Codec(format!("duplicate element index {index}")));
            }
            *slot = Some(((!name.is_empty()).then_some(name), element));
        }
    }

    if reader.buf.has_remaining() {
        return Err(Error::Codec(format!(
            "{} trailing bytes after the last group",
            reader.buf.remaining()
        )));
    }

    let mut circuit = Circuit::new();
    for (index, slot) in slots.into_iter().enumerate() {
        let (name, element) =
            slot.ok_or_else(|| Error::Codec(format!("element {index} is missing")))?;
        match name {
            Some(name) => circuit.add_named(name, element),
            None => circuit.add(element),
        };
    }
    circuit.set_tick_rate(tick_rate)?;
    debug!("decoded {count} elements");
    Ok(circuit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{
        AcVoltageSource, Bjt, Diode, Resistor, SquareVoltageSource, VoltageSource,
    };

    fn sample() -> Circuit {
        let mut c = Circuit::new();
        let (n1, n2, n3) = (c.node(), c.node(), c.node());
        c.add_named("supply", VoltageSource::new(n1, Node::GROUND, 9.0));
        c.add(Resistor::new(n1, n2, 1e3));
        c.add(Diode::new(n2, Node::GROUND).with_emission(1.8));
        c.add_named("rb", Resistor::new(n1, n3, 47e3));
        c.add(Bjt::pnp(n2, n3, Node::GROUND).with_beta(50.0));
        c.add(
            SquareVoltageSource::new(n3, Node::GROUND, 2.0, 5.0)
                .with_duty(0.25)
                .with_offset(1.0),
        );
        c.set_tick_rate(0.01).unwrap();
        c
    }

    #[test]
    fn test_round_trip_preserves_order_names_and_params() {
        let original = sample();
        let bytes = encode(&original).unwrap();
        assert_eq!(&bytes[..4], MAGIC);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.len(), original.len());
        assert!((decoded.tick_rate() - 0.01).abs() < f64::EPSILON);
        for (a, b) in original.ids().zip(decoded.ids()) {
            let (ea, eb) = (original.element(a).unwrap(), decoded.element(b).unwrap());
            assert_eq!(ea.kind(), eb.kind());
            assert_eq!(ea.pins(), eb.pins());
            assert_eq!(ea.component().params(), eb.component().params());
            assert_eq!(original.name(a), decoded.name(b));
        }
        assert_eq!(decoded.find("rb"), Some(ElementId::new(3)));
    }

    #[test]
    fn test_unprepared_fast_source_round_trips() {
        let mut c = Circuit::new();
        let n1 = c.node();
        c.add(AcVoltageSource::new(n1, Node::GROUND, 10.0, 50.0));
        c.add(Resistor::new(n1, Node::GROUND, 100.0));
        assert!((c.tick_rate() - crate::circuit::DEFAULT_TICK_RATE).abs() < f64::EPSILON);

        let mut decoded = decode(&encode(&c).unwrap()).unwrap();
        assert!((decoded.tick_rate() - 0.0025).abs() < f64::EPSILON);
        decoded.tick().unwrap();
    }

    #[test]
    fn test_resistors_share_one_group() {
        let bytes = encode(&sample()).unwrap();
        // magic, version, tick rate, count, width
        let groups = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]);
        assert_eq!(groups, 5);
    }

    #[test]
    fn test_truncated_input() {
        let bytes = encode(&sample()).unwrap();
        for cut in [0, 3, 10, bytes.len() / 2, bytes.len() - 1] {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, Error::Codec(_)), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn test_bad_magic_and_unknown_tag() {
        let mut bytes = encode(&sample()).unwrap().to_vec();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(Error::Codec(_))));

        let mut bytes = encode(&sample()).unwrap().to_vec();
        bytes[22] = 0xff;
        assert!(matches!(decode(&bytes), Err(Error::UnknownElementTag(_))));
    }

    #[test]
    fn test_wide_index_for_large_circuits() {
        let mut c = Circuit::new();
        let n1 = c.node();
        c.add(VoltageSource::new(n1, Node::GROUND, 1.0));
        for _ in 0..300 {
            c.add(Resistor::new(n1, Node::GROUND, 100.0));
        }
        let bytes = encode(&c).unwrap();
        assert_eq!(bytes[17], 2);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.len(), 301);
    }
}
