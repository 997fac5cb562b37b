//! Custom serde helpers for JSON-RPC params handling.

/// Params carried as a single-element sequence, per JSON-RPC convention for
/// positional params.
pub mod sequence {
    use serde::{
        Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned,
        ser::SerializeSeq,
    };

    pub fn serialize<S, T>(val: &T, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut seq = s.serialize_seq(Some(1))?;
        seq.serialize_element(val)?;
        seq.end()
    }

    pub fn deserialize<'de, T, D>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let mut seq = Vec::<T>::deserialize(d)?;
        if seq.len() != 1 {
            return Err(serde::de::Error::custom(format!(
                "expected params sequence with length 1 but got {}",
                seq.len()
            )));
        }
        Ok(seq.remove(0))
    }
}

/// Accepts missing params, `null`, or an empty array.
pub mod empty_params {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(d: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        let params = Option::<Vec<()>>::deserialize(d)?;
        if let Some(params) = params
            && !params.is_empty()
        {
            return Err(serde::de::Error::custom(format!(
                "expected params sequence with length 0 but got {}",
                params.len()
            )));
        }
        Ok(())
    }
}
