use crate::catalog::CatalogEntry;
use crate::encoding::error::Error;
use crate::encoding::{Decoder, Encoder};
use bytes::{Buf, BufMut};

impl Encoder for CatalogEntry {
    type Error = Error;

    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut,
    {
        self.name().to_string().encode(buf)?;
        self.definition().to_string().encode(buf)?;
        self.datasource_info().to_string().encode(buf)?;
        self.effective_datasource_info().to_string().encode(buf)?;
        self.xmla_enabled().encode(buf)?;
        self.domain_id().map(str::to_string).encode(buf)?;
        Ok(())
    }
}

impl Decoder for CatalogEntry {
    type Error = Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let name = String::decode(buf)?;
        let definition = String::decode(buf)?;
        let datasource_info = String::decode(buf)?;
        let effective = String::decode(buf)?;
        let xmla_enabled = bool::decode(buf)?;
        let domain_id = Option::<String>::decode(buf)?;
        let entry = CatalogEntry::new(name, definition, datasource_info)
            .with_effective_datasource_info(effective)
            .with_xmla_enabled(xmla_enabled);
        Ok(match domain_id {
            Some(domain_id) => entry.with_domain_id(domain_id),
            None => entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_entry() {
        let mut buffer = Vec::new();
        // effective info deliberately differs from what the raw descriptor resolves to
        let entry = CatalogEntry::new("Sales", "mondrian:/Sales", "Provider=mondrian;DataSource=ds1")
            .with_effective_datasource_info("DataSource=java:comp/env/jdbc/ds1")
            .with_xmla_enabled(true)
            .with_domain_id("Sales.mondrian.xml");
        entry.encode(&mut buffer).unwrap();
        let decoded = CatalogEntry::decode(&mut buffer.as_slice()).unwrap();
        assert_eq!(decoded, entry);
        assert!(CatalogEntry::decode(&mut &buffer[..buffer.len() - 2]).is_err());
    }
}
