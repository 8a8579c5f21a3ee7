//! Digest computation for `eth_signTypedData` payloads.
//!
//! Three incompatible hashing schemes coexist under the same RPC name and are
//! told apart by a version tag:
//!
//! - `V1` is the legacy pre-EIP-712 rule: the ordered field list is hashed
//!   positionally, with no domain separator.
//! - `V3` is [EIP-712](https://eips.ethereum.org/EIPS/eip-712), except that
//!   arrays are not supported.
//! - `V4` is EIP-712 with full support for arrays and nested structs.
//!
//! The version is a closed enum, so adding or removing one is a
//! compile-time-checked change. Hashing is deterministic and side-effect
//! free; all validation happens before anything is hashed.

use std::{collections::HashSet, fmt, str::FromStr};

use ethers_core::{
    abi::{self, HumanReadableParser, ParamType, Token},
    types::{
        serde_helpers::StringifiedNumeric,
        transaction::eip712::{TypedData, Types},
        Address, Bytes, H256, U256,
    },
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error produced while hashing a typed-data payload.
#[derive(Debug, Error)]
pub enum TypedDataError {
    /// The version token is not one of `V1`, `V3` or `V4`.
    #[error("invalid typed data version: `{0}`")]
    UnsupportedVersion(String),
    /// The version is recognized but excluded by the caller's allow-list.
    #[error(
        "typed data version not allowed: `{version}`, allowed versions are: [{}]",
        .allowed.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
    )]
    VersionNotAllowed { version: TypedDataVersion, allowed: Vec<TypedDataVersion> },
    /// Array fields only exist in the V4 encoding.
    #[error("arrays are unsupported under {0}, use V4")]
    ArraysUnsupported(TypedDataVersion),
    #[error("no type definition found for `{0}`")]
    MissingType(String),
    #[error("no data found for field `{0}`")]
    MissingValue(String),
    #[error("failed to parse type `{ty}`: {msg}")]
    InvalidType { ty: String, msg: String },
    #[error("invalid value for type `{ty}`: {msg}")]
    InvalidValue { ty: String, msg: String },
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

/// The typed-data hashing scheme requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypedDataVersion {
    V1,
    V3,
    V4,
}

impl fmt::Display for TypedDataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypedDataVersion::V1 => "V1",
            TypedDataVersion::V3 => "V3",
            TypedDataVersion::V4 => "V4",
        })
    }
}

impl FromStr for TypedDataVersion {
    type Err = TypedDataError;

    /// Version tokens are matched exactly; `v4` is not a version.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V1" => Ok(TypedDataVersion::V1),
            "V3" => Ok(TypedDataVersion::V3),
            "V4" => Ok(TypedDataVersion::V4),
            other => Err(TypedDataError::UnsupportedVersion(other.to_string())),
        }
    }
}

/// Checks `version` against an optional caller-supplied allow-list.
///
/// With no allow-list every recognized version passes. The error names both
/// the rejected version and the allowed set.
pub fn validate_version(
    version: TypedDataVersion,
    allowed: Option<&[TypedDataVersion]>,
) -> Result<(), TypedDataError> {
    match allowed {
        Some(allowed) if !allowed.contains(&version) => {
            Err(TypedDataError::VersionNotAllowed { version, allowed: allowed.to_vec() })
        }
        _ => Ok(()),
    }
}

/// One entry of a legacy V1 payload: an ordered (type, name, value) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataV1Field {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
    pub value: serde_json::Value,
}

/// A version-tagged typed-data payload ready for digest computation.
///
/// V1 payloads are a flat field list; V3 and V4 carry the full EIP-712
/// object (domain, types, primary type and message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedDataRequest {
    V1(Vec<TypedDataV1Field>),
    V3(TypedData),
    V4(TypedData),
}

impl TypedDataRequest {
    pub fn version(&self) -> TypedDataVersion {
        match self {
            TypedDataRequest::V1(_) => TypedDataVersion::V1,
            TypedDataRequest::V3(_) => TypedDataVersion::V3,
            TypedDataRequest::V4(_) => TypedDataVersion::V4,
        }
    }

    /// Computes the 32-byte digest to sign for this payload.
    pub fn digest(&self) -> Result<H256, TypedDataError> {
        match self {
            TypedDataRequest::V1(fields) => typed_signature_hash(fields),
            TypedDataRequest::V3(data) => eip712_digest(data, TypedDataVersion::V3),
            TypedDataRequest::V4(data) => eip712_digest(data, TypedDataVersion::V4),
        }
    }

    /// Builds a request from the JSON shape each version expects: the field
    /// array for V1, the typed-data object (possibly JSON-stringified, which
    /// [`TypedData`]'s deserializer accepts) for V3 and V4.
    pub fn from_json(
        version: TypedDataVersion,
        data: serde_json::Value,
    ) -> Result<Self, TypedDataError> {
        Ok(match version {
            TypedDataVersion::V1 => TypedDataRequest::V1(serde_json::from_value(data)?),
            TypedDataVersion::V3 => TypedDataRequest::V3(serde_json::from_value(data)?),
            TypedDataVersion::V4 => TypedDataRequest::V4(serde_json::from_value(data)?),
        })
    }
}

/// Hashes a legacy V1 field list.
///
/// The digest is `keccak256(keccak256(packed schema) ∥ keccak256(packed
/// values))` where the schema entries are the `"type name"` strings and each
/// value is tightly packed in Solidity `abi.encodePacked` form according to
/// its declared type.
pub fn typed_signature_hash(fields: &[TypedDataV1Field]) -> Result<H256, TypedDataError> {
    let mut schema = Vec::with_capacity(fields.len());
    let mut packed = Vec::new();

    for field in fields {
        schema.push(format!("{} {}", field.r#type, field.name));
        let ty = parse_param_type(&field.r#type)?;
        pack_solidity_value(&ty, &field.r#type, &field.value, &mut packed)?;
    }

    let schema_hash = keccak256(schema.concat());
    let data_hash = keccak256(packed);
    Ok(H256(keccak256([&schema_hash[..], &data_hash[..]].concat())))
}

/// Tightly packs one value per Solidity `abi.encodePacked` rules: no
/// padding, numerics truncated to their declared width.
fn pack_solidity_value(
    ty: &ParamType,
    raw_ty: &str,
    value: &serde_json::Value,
    out: &mut Vec<u8>,
) -> Result<(), TypedDataError> {
    match ty {
        ParamType::Address => {
            let addr: Address = serde_json::from_value(value.clone())?;
            out.extend_from_slice(addr.as_bytes());
        }
        ParamType::Bool => {
            let b: bool = serde_json::from_value(value.clone())?;
            out.push(b as u8);
        }
        ParamType::String => {
            let s: String = serde_json::from_value(value.clone())?;
            out.extend_from_slice(s.as_bytes());
        }
        ParamType::Bytes => {
            let data: Bytes = serde_json::from_value(value.clone())?;
            out.extend_from_slice(&data);
        }
        ParamType::FixedBytes(size) => {
            let data: Bytes = serde_json::from_value(value.clone())?;
            if data.len() != *size {
                return Err(TypedDataError::InvalidValue {
                    ty: raw_ty.to_string(),
                    msg: format!("expected {} bytes, got {}", size, data.len()),
                })
            }
            out.extend_from_slice(&data);
        }
        ParamType::Uint(bits) | ParamType::Int(bits) => {
            let uint = parse_numeric(raw_ty, value)?;
            let mut buf = [0u8; 32];
            uint.to_big_endian(&mut buf);
            out.extend_from_slice(&buf[32 - bits / 8..]);
        }
        _ => {
            return Err(TypedDataError::InvalidType {
                ty: raw_ty.to_string(),
                msg: "arrays and tuples are not supported in V1 payloads".to_string(),
            })
        }
    }
    Ok(())
}

/// Hashes a V3 or V4 typed-data object: `keccak256(0x1901 ∥ domain
/// separator ∥ struct hash)`.
///
/// For compatibility with MetaMask's eth-sig-util, a payload whose primary
/// type is `EIP712Domain` hashes the domain alone.
pub fn eip712_digest(data: &TypedData, version: TypedDataVersion) -> Result<H256, TypedDataError> {
    if version == TypedDataVersion::V1 {
        return Err(TypedDataError::Message(
            "V1 payloads have no EIP-712 encoding, use typed_signature_hash".to_string(),
        ))
    }

    let domain_separator = data.domain.separator();
    let mut digest_input = [&[0x19, 0x01][..], &domain_separator[..]].concat();

    if data.primary_type != "EIP712Domain" {
        let message = serde_json::Value::Object(serde_json::Map::from_iter(data.message.clone()));
        let struct_hash = hash_struct(&data.primary_type, &message, &data.types, version)?;
        digest_input.extend_from_slice(&struct_hash);
    }

    Ok(H256(keccak256(digest_input)))
}

/// Hash of a struct instance per the EIP-712 `hashStruct` definition.
pub fn hash_struct(
    primary_type: &str,
    data: &serde_json::Value,
    types: &Types,
    version: TypedDataVersion,
) -> Result<[u8; 32], TypedDataError> {
    let tokens = encode_data(primary_type, data, types, version)?;
    Ok(keccak256(abi::encode(&tokens)))
}

/// Encodes a struct instance member by member: the type hash first, then one
/// 32-byte word per field in declaration order.
fn encode_data(
    primary_type: &str,
    data: &serde_json::Value,
    types: &Types,
    version: TypedDataVersion,
) -> Result<Vec<Token>, TypedDataError> {
    let type_hash = hash_type(primary_type, types)?;
    let mut tokens = vec![Token::Uint(U256::from(type_hash))];

    let fields = types
        .get(primary_type)
        .ok_or_else(|| TypedDataError::MissingType(primary_type.to_string()))?;

    for field in fields {
        match data.get(field.name.as_str()).filter(|value| !value.is_null()) {
            Some(value) => {
                tokens.push(encode_field(types, &field.name, &field.r#type, value, version)?)
            }
            // V3 skips absent fields outright
            None if version == TypedDataVersion::V3 => continue,
            // absent nested structs hash to the zero word under V4
            None if types.contains_key(&field.r#type) => tokens.push(Token::Uint(U256::zero())),
            None => return Err(TypedDataError::MissingValue(field.name.clone())),
        }
    }

    Ok(tokens)
}

/// Encodes a single field to its 32-byte word.
fn encode_field(
    types: &Types,
    field_name: &str,
    field_type: &str,
    value: &serde_json::Value,
    version: TypedDataVersion,
) -> Result<Token, TypedDataError> {
    // nested struct: recurse and hash
    if types.contains_key(field_type) {
        let tokens = encode_data(field_type, value, types, version)?;
        return Ok(Token::Uint(U256::from(keccak256(abi::encode(&tokens)))))
    }

    if field_type.contains('[') {
        if version != TypedDataVersion::V4 {
            return Err(TypedDataError::ArraysUnsupported(version))
        }
        let (stripped_type, _) = field_type.rsplit_once('[').unwrap();
        let values = value.as_array().ok_or_else(|| TypedDataError::InvalidValue {
            ty: field_type.to_string(),
            msg: format!("expected array, got `{value}`"),
        })?;
        let tokens = values
            .iter()
            .map(|value| encode_field(types, field_name, stripped_type, value, version))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Token::Uint(U256::from(keccak256(abi::encode(&tokens)))))
    }

    encode_leaf(field_type, value)
}

/// Encodes an atomic (non-struct, non-array) value.
fn encode_leaf(field_type: &str, value: &serde_json::Value) -> Result<Token, TypedDataError> {
    let token = match parse_param_type(field_type)? {
        ParamType::Address => Token::Address(serde_json::from_value(value.clone())?),
        ParamType::Bytes => {
            let data: Bytes = serde_json::from_value(value.clone())?;
            Token::Uint(U256::from(keccak256(data)))
        }
        ParamType::String => {
            let s: String = serde_json::from_value(value.clone())?;
            Token::Uint(U256::from(keccak256(s)))
        }
        ParamType::Bool => {
            // booleans are encoded as uint256 zero and one
            let b: bool = serde_json::from_value(value.clone())?;
            Token::Uint(U256::from(b as u8))
        }
        ParamType::Uint(_) | ParamType::Int(_) => Token::Uint(parse_numeric(field_type, value)?),
        ParamType::FixedBytes(size) => {
            let data: Bytes = serde_json::from_value(value.clone())?;
            if data.len() != size {
                return Err(TypedDataError::InvalidValue {
                    ty: field_type.to_string(),
                    msg: format!("expected {} bytes, got {}", size, data.len()),
                })
            }
            Token::FixedBytes(data.to_vec())
        }
        other => {
            return Err(TypedDataError::InvalidType {
                ty: field_type.to_string(),
                msg: format!("`{other}` cannot appear as a leaf field"),
            })
        }
    };
    Ok(token)
}

/// Returns the hash of the encoded type string of `primary_type`.
pub fn hash_type(primary_type: &str, types: &Types) -> Result<[u8; 32], TypedDataError> {
    encode_type(primary_type, types).map(keccak256)
}

/// Encodes a type as its name and a comma delimited list of its members,
/// followed by its transitive dependencies in alphabetical order.
pub fn encode_type(primary_type: &str, types: &Types) -> Result<String, TypedDataError> {
    let mut names = HashSet::new();
    find_type_dependencies(primary_type, types, &mut names);
    // primary_type always comes first
    names.remove(primary_type);
    let mut deps: Vec<_> = names.into_iter().collect();
    deps.sort_unstable();
    deps.insert(0, primary_type);

    let mut res = String::new();
    for dep in deps {
        let fields =
            types.get(dep).ok_or_else(|| TypedDataError::MissingType(dep.to_string()))?;

        res += dep;
        res.push('(');
        res += &fields
            .iter()
            .map(|field| format!("{} {}", field.r#type, field.name))
            .collect::<Vec<_>>()
            .join(",");
        res.push(')');
    }
    Ok(res)
}

fn find_type_dependencies<'a>(
    primary_type: &'a str,
    types: &'a Types,
    found: &mut HashSet<&'a str>,
) {
    if found.contains(primary_type) {
        return
    }
    if let Some(fields) = types.get(primary_type) {
        found.insert(primary_type);
        for field in fields {
            // strip the array tail
            let ty = field.r#type.split('[').next().unwrap();
            find_type_dependencies(ty, types, found)
        }
    }
}

fn parse_param_type(ty: &str) -> Result<ParamType, TypedDataError> {
    HumanReadableParser::parse_type(ty)
        .map_err(|err| TypedDataError::InvalidType { ty: ty.to_string(), msg: err.to_string() })
}

/// Parses a JSON numeric value, which ethers-js commonly stringifies.
/// Negative integers are sign-extended to 256 bits.
fn parse_numeric(ty: &str, value: &serde_json::Value) -> Result<U256, TypedDataError> {
    if let Some(n) = value.as_i64() {
        if n < 0 {
            let magnitude = U256::from(n.unsigned_abs());
            return Ok((!magnitude).overflowing_add(U256::one()).0)
        }
    }
    let val: StringifiedNumeric = serde_json::from_value(value.clone())?;
    val.try_into().map_err(|err| TypedDataError::InvalidValue {
        ty: ty.to_string(),
        msg: format!("failed to parse numeric: {err}"),
    })
}

// Vectors adapted from <https://github.com/MetaMask/eth-sig-util/blob/main/src/sign-typed-data.test.ts>
#[cfg(test)]
mod tests {
    use super::*;

    fn digest_hex(data: &TypedData, version: TypedDataVersion) -> String {
        hex::encode(eip712_digest(data, version).unwrap())
    }

    #[test]
    fn version_tokens_parse_exactly() {
        assert_eq!("V1".parse::<TypedDataVersion>().unwrap(), TypedDataVersion::V1);
        assert_eq!("V3".parse::<TypedDataVersion>().unwrap(), TypedDataVersion::V3);
        assert_eq!("V4".parse::<TypedDataVersion>().unwrap(), TypedDataVersion::V4);

        for bad in ["V2", "v1", "v4", "V5", ""] {
            let err = bad.parse::<TypedDataVersion>().unwrap_err();
            assert!(matches!(err, TypedDataError::UnsupportedVersion(ref t) if t == bad));
        }
    }

    #[test]
    fn allow_list_is_enforced() {
        validate_version(TypedDataVersion::V4, None).unwrap();
        validate_version(TypedDataVersion::V4, Some(&[TypedDataVersion::V3, TypedDataVersion::V4]))
            .unwrap();

        let err = validate_version(TypedDataVersion::V1, Some(&[TypedDataVersion::V4]))
            .unwrap_err();
        match err {
            TypedDataError::VersionNotAllowed { version, allowed } => {
                assert_eq!(version, TypedDataVersion::V1);
                assert_eq!(allowed, vec![TypedDataVersion::V4]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // the message names both sides
        let err = validate_version(TypedDataVersion::V1, Some(&[TypedDataVersion::V4]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "typed data version not allowed: `V1`, allowed versions are: [V4]"
        );
    }

    #[test]
    fn v1_hashes_a_string_field() {
        let fields = vec![TypedDataV1Field {
            name: "message".to_string(),
            r#type: "string".to_string(),
            value: serde_json::json!("Hi, Alice!"),
        }];
        assert_eq!(
            hex::encode(typed_signature_hash(&fields).unwrap()),
            "14b9f24872e28cc49e72dc104d7380d8e0ba84a3fe2e712704bcac66a5702bd5"
        );
    }

    #[test]
    fn v1_packs_values_to_their_declared_width() {
        let fields: Vec<TypedDataV1Field> = serde_json::from_value(serde_json::json!([
            { "type": "uint32", "name": "amount", "value": 42 },
            { "type": "bool", "name": "active", "value": true },
            { "type": "address", "name": "owner", "value": "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23" },
            { "type": "bytes8", "name": "tag", "value": "0x0102030405060708" },
        ]))
        .unwrap();
        assert_eq!(
            hex::encode(typed_signature_hash(&fields).unwrap()),
            "efd6fa934b853e3b00ae0ac4286a08227c5ccd8465fcdebed8fa4075f39722a7"
        );
    }

    #[test]
    fn v1_is_deterministic_and_order_sensitive() {
        let a = TypedDataV1Field {
            name: "a".to_string(),
            r#type: "string".to_string(),
            value: serde_json::json!("x"),
        };
        let b = TypedDataV1Field {
            name: "b".to_string(),
            r#type: "string".to_string(),
            value: serde_json::json!("y"),
        };
        let fields = vec![a.clone(), b.clone()];
        assert_eq!(typed_signature_hash(&fields).unwrap(), typed_signature_hash(&fields).unwrap());
        assert_ne!(
            typed_signature_hash(&[a.clone(), b.clone()]).unwrap(),
            typed_signature_hash(&[b, a]).unwrap()
        );
    }

    #[test]
    fn v1_rejects_array_types() {
        let fields = vec![TypedDataV1Field {
            name: "xs".to_string(),
            r#type: "uint256[]".to_string(),
            value: serde_json::json!([1, 2]),
        }];
        assert!(typed_signature_hash(&fields).is_err());
    }

    #[test]
    fn hashes_the_full_domain() {
        let json = serde_json::json!({
          "types": {
            "EIP712Domain": [
              { "name": "name", "type": "string" },
              { "name": "version", "type": "string" },
              { "name": "chainId", "type": "uint256" },
              { "name": "verifyingContract", "type": "address" },
              { "name": "salt", "type": "bytes32" }
            ]
          },
          "primaryType": "EIP712Domain",
          "domain": {
            "name": "example.metamask.io",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0x0000000000000000000000000000000000000000"
          },
          "message": {}
        });
        let typed_data: TypedData = serde_json::from_value(json).unwrap();
        assert_eq!(
            digest_hex(&typed_data, TypedDataVersion::V4),
            "122d1c8ef94b76dad44dcb03fa772361e20855c63311a15d5afe02d1b38f6077"
        );
    }

    #[test]
    fn hashes_the_minimal_message() {
        let json = serde_json::json!({
            "types": { "EIP712Domain": [] },
            "primaryType": "EIP712Domain",
            "domain": {},
            "message": {}
        });
        let typed_data: TypedData = serde_json::from_value(json).unwrap();
        assert_eq!(
            digest_hex(&typed_data, TypedDataVersion::V4),
            "8d4a3f4082945b7879e2b55f181c31a77c8c0a464b70669458abbaaf99de4c38"
        );
    }

    fn mail_payload() -> TypedData {
        serde_json::from_value(serde_json::json!({
            "domain": {},
            "types": {
                "EIP712Domain": [],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person" },
                    { "name": "contents", "type": "string" }
                ]
            },
            "primaryType": "Mail",
            "message": {
                "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                "contents": "Hello, Bob!"
            }
        }))
        .unwrap()
    }

    #[test]
    fn hashes_nested_structs() {
        let typed_data = mail_payload();
        assert_eq!(
            digest_hex(&typed_data, TypedDataVersion::V4),
            "25c3d40a39e639a4d0b6e4d2ace5e1281e039c88494d97d8d08f99a6ea75d775"
        );
    }

    #[test]
    fn v3_and_v4_agree_on_array_free_payloads() {
        let typed_data = mail_payload();
        assert_eq!(
            eip712_digest(&typed_data, TypedDataVersion::V3).unwrap(),
            eip712_digest(&typed_data, TypedDataVersion::V4).unwrap()
        );
    }

    fn mail_with_arrays_payload() -> TypedData {
        serde_json::from_value(serde_json::json!({
            "domain": {},
            "types": {
                "EIP712Domain": [],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address[]" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person[]" },
                    { "name": "contents", "type": "string" }
                ]
            },
            "primaryType": "Mail",
            "message": {
                "from": {
                    "name": "Cow",
                    "wallet": [
                        "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826",
                        "0xDD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"
                    ]
                },
                "to": [{ "name": "Bob", "wallet": ["0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"] }],
                "contents": "Hello, Bob!"
            }
        }))
        .unwrap()
    }

    #[test]
    fn v4_hashes_custom_array_types() {
        let typed_data = mail_with_arrays_payload();
        assert_eq!(
            digest_hex(&typed_data, TypedDataVersion::V4),
            "80a3aeb51161cfc47884ddf8eac0d2343d6ae640efe78b6a69be65e3045c1321"
        );
    }

    #[test]
    fn v3_rejects_arrays() {
        let typed_data = mail_with_arrays_payload();
        let err = eip712_digest(&typed_data, TypedDataVersion::V3).unwrap_err();
        assert!(matches!(err, TypedDataError::ArraysUnsupported(TypedDataVersion::V3)));
    }

    #[test]
    fn v4_hashes_recursive_types() {
        let json = serde_json::json!({
            "domain": {},
            "types": {
                "EIP712Domain": [],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person" },
                    { "name": "contents", "type": "string" },
                    { "name": "replyTo", "type": "Mail" }
                ]
            },
            "primaryType": "Mail",
            "message": {
                "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                "contents": "Hello, Bob!",
                "replyTo": {
                    "to": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                    "from": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                    "contents": "Hello!"
                }
            }
        });
        let typed_data: TypedData = serde_json::from_value(json).unwrap();
        assert_eq!(
            digest_hex(&typed_data, TypedDataVersion::V4),
            "0808c17abba0aef844b0470b77df9c994bc0fa3e244dc718afd66a3901c4bd7b"
        );
    }

    #[test]
    fn v4_hashes_nested_struct_arrays() {
        let json = serde_json::json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "OrderComponents": [
                    { "name": "offerer", "type": "address" },
                    { "name": "zone", "type": "address" },
                    { "name": "offer", "type": "OfferItem[]" },
                    { "name": "startTime", "type": "uint256" },
                    { "name": "endTime", "type": "uint256" },
                    { "name": "zoneHash", "type": "bytes32" },
                    { "name": "salt", "type": "uint256" },
                    { "name": "conduitKey", "type": "bytes32" },
                    { "name": "counter", "type": "uint256" }
                ],
                "OfferItem": [
                    { "name": "token", "type": "address" }
                ],
                "ConsiderationItem": [
                    { "name": "token", "type": "address" },
                    { "name": "identifierOrCriteria", "type": "uint256" },
                    { "name": "startAmount", "type": "uint256" },
                    { "name": "endAmount", "type": "uint256" },
                    { "name": "recipient", "type": "address" }
                ]
            },
            "primaryType": "OrderComponents",
            "domain": {
                "name": "Seaport",
                "version": "1.1",
                "chainId": "1",
                "verifyingContract": "0x00000000006c3852cbEf3e08E8dF289169EdE581"
            },
            "message": {
                "offerer": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
                "offer": [
                    { "token": "0xA604060890923Ff400e8c6f5290461A83AEDACec" }
                ],
                "startTime": "1658645591",
                "endTime": "1659250386",
                "zone": "0x004C00500000aD104D7DBd00e3ae0A5C00560C00",
                "zoneHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "salt": "16178208897136618",
                "conduitKey": "0x0000007b02230091a7ed01230072f7006a004d60a8d4e71d599b8104250f0000",
                "totalOriginalConsiderationItems": "2",
                "counter": "0"
            }
        });
        let typed_data: TypedData = serde_json::from_value(json).unwrap();
        assert_eq!(
            digest_hex(&typed_data, TypedDataVersion::V4),
            "0b8aa9f3712df0034bc29fe5b24dd88cfdba02c7f499856ab24632e2969709a8"
        );
    }

    #[test]
    fn hashes_a_typed_message_with_data() {
        let json = serde_json::json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Message": [
                    { "name": "data", "type": "string" }
                ]
            },
            "primaryType": "Message",
            "domain": {
                "name": "example.metamask.io",
                "version": "1",
                "chainId": "1",
                "verifyingContract": "0x0000000000000000000000000000000000000000"
            },
            "message": { "data": "Hello!" }
        });
        let typed_data: TypedData = serde_json::from_value(json).unwrap();
        let expected = "232cd3ec058eb935a709f093e3536ce26cc9e8e193584b0881992525f6236eef";
        assert_eq!(digest_hex(&typed_data, TypedDataVersion::V4), expected);
        // array-free, so V3 agrees
        assert_eq!(digest_hex(&typed_data, TypedDataVersion::V3), expected);
    }

    #[test]
    fn rejects_fixed_bytes_of_the_wrong_width() {
        // an oversized value would span two encoded words and shift every
        // following field of the struct hash
        for value in ["0x010203040506070809", "0x01020304050607"] {
            let json = serde_json::json!({
                "domain": {},
                "types": {
                    "EIP712Domain": [],
                    "Blob": [
                        { "name": "tag", "type": "bytes8" },
                        { "name": "note", "type": "string" }
                    ]
                },
                "primaryType": "Blob",
                "message": { "tag": value, "note": "after" }
            });
            let typed_data: TypedData = serde_json::from_value(json).unwrap();
            let err = eip712_digest(&typed_data, TypedDataVersion::V4).unwrap_err();
            assert!(matches!(err, TypedDataError::InvalidValue { ref ty, .. } if ty == "bytes8"));
        }
    }

    #[test]
    fn digests_are_deterministic() {
        let typed_data = mail_with_arrays_payload();
        let request = TypedDataRequest::V4(typed_data);
        assert_eq!(request.digest().unwrap(), request.digest().unwrap());
    }

    #[test]
    fn request_dispatches_by_version() {
        let fields = vec![TypedDataV1Field {
            name: "message".to_string(),
            r#type: "string".to_string(),
            value: serde_json::json!("Hi, Alice!"),
        }];
        let request = TypedDataRequest::V1(fields.clone());
        assert_eq!(request.version(), TypedDataVersion::V1);
        assert_eq!(request.digest().unwrap(), typed_signature_hash(&fields).unwrap());

        let data = mail_payload();
        assert_eq!(TypedDataRequest::V3(data.clone()).version(), TypedDataVersion::V3);
        assert_eq!(
            TypedDataRequest::V4(data.clone()).digest().unwrap(),
            eip712_digest(&data, TypedDataVersion::V4).unwrap()
        );
    }
}
