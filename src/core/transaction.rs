use crate::utils::sha256_hex;
use serde::{Deserialize, Serialize};

/// A unit of work produced by running a script against a dataset.
///
/// The id is the hex SHA-256 of the data. Two transactions with the same
/// output share an id; nothing deduplicates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: String,
    data: String,
}

impl Transaction {
    pub fn new(data: String) -> Transaction {
        Transaction {
            id: sha256_hex(data.as_bytes()),
            data,
        }
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_data(&self) -> &str {
        self.data.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_hash_of_data() {
        let tx = Transaction::new("abc".to_string());
        assert_eq!(
            tx.get_id(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(tx.get_data(), "abc");
    }

    #[test]
    fn test_duplicate_data_yields_duplicate_id() {
        let first = Transaction::new("same output\n".to_string());
        let second = Transaction::new("same output\n".to_string());
        assert_eq!(first, second);
    }
}
