use crate::error::DesignerError;
use crate::store::adapter::PERSISTENCE_SHEET;

/// Normalize a user-entered binding address.
///
/// Returns `Ok(None)` for a blank address (unbinds the field). Addresses
/// inside the persistence sheet are refused.
pub fn validate_address(raw: &str) -> Result<Option<String>, DesignerError> {
    let address = raw.trim();
    if address.is_empty() {
        return Ok(None);
    }
    if is_reserved(address) {
        return Err(DesignerError::ReservedAddress(address.to_string()));
    }
    Ok(Some(address.to_string()))
}

/// Whether `address` points into the persistence sheet, with or without
/// quoting (`_FormDesignerMeta!A1`, `'_FormDesignerMeta'!B2`).
pub fn is_reserved(address: &str) -> bool {
    let sheet = match address.split_once('!') {
        Some((sheet, _)) => sheet,
        None => address,
    };
    let sheet = sheet.trim().trim_matches('\'');
    sheet.eq_ignore_ascii_case(PERSISTENCE_SHEET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_address_unbinds() {
        assert_eq!(validate_address("   ").expect("blank is valid"), None);
    }

    #[test]
    fn address_is_trimmed() {
        assert_eq!(
            validate_address(" Sheet1!B2 ").expect("valid"),
            Some("Sheet1!B2".to_string())
        );
    }

    #[test]
    fn persistence_sheet_is_reserved() {
        assert!(is_reserved("_FormDesignerMeta!A1"));
        assert!(is_reserved("'_formdesignermeta'!C3"));
        assert!(is_reserved("_FormDesignerMeta"));
        assert!(!is_reserved("Sheet1!A1"));
        assert!(!is_reserved("CustomerName"));
        assert!(validate_address("_FormDesignerMeta!B7").is_err());
    }
}
