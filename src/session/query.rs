//! What a session fetches
//!
//! Positional arguments follow the kubectl shapes: `TYPE[,TYPE...] [NAME...]`
//! or one or more `TYPE/NAME`. Manifest files stand in for arguments.

use crate::error::StatusError;
use crate::models::ResourceObject;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryTarget {
    /// Every object of each type
    List { types: Vec<String> },
    /// Named objects, each looked up under every type
    Named {
        types: Vec<String>,
        names: Vec<String>,
    },
    /// `TYPE/NAME` pairs
    Pairs(Vec<(String, String)>),
    /// Documents from manifest files
    Manifests(Vec<ResourceObject>),
}

impl QueryTarget {
    /// Parse positional arguments
    pub fn from_args(args: &[String]) -> Result<Self, StatusError> {
        let Some(first) = args.first() else {
            return Err(StatusError::conflict(
                "You must provide one or more resources by argument or filename.",
            ));
        };

        if args.iter().any(|arg| arg.contains('/')) {
            if !args.iter().all(|arg| arg.contains('/')) {
                return Err(StatusError::conflict(
                    "there is no need to specify a resource type as a separate argument when passing arguments in resource/name form",
                ));
            }
            let pairs = args
                .iter()
                .map(|arg| match arg.split_once('/') {
                    Some((kind, name))
                        if !kind.is_empty() && !name.is_empty() && !name.contains('/') =>
                    {
                        Ok((kind.to_string(), name.to_string()))
                    }
                    _ => Err(StatusError::conflict(format!(
                        "arguments in resource/name form must have a single resource and name: {}",
                        arg
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(QueryTarget::Pairs(pairs));
        }

        let types: Vec<String> = first
            .split(',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if types.is_empty() {
            return Err(StatusError::conflict(format!(
                "no resource type in argument {:?}",
                first
            )));
        }

        let names = args[1..].to_vec();
        if names.is_empty() {
            Ok(QueryTarget::List { types })
        } else {
            Ok(QueryTarget::Named { types, names })
        }
    }

    /// Target for a session given arguments and already parsed manifests
    ///
    /// Manifest documents win in local mode; in live mode they cannot be
    /// combined with positional arguments.
    pub fn build(
        args: &[String],
        manifests: Option<Vec<ResourceObject>>,
        local: bool,
    ) -> Result<Self, StatusError> {
        match manifests {
            Some(documents) if local || args.is_empty() => {
                if local && !args.is_empty() {
                    tracing::debug!("Ignoring resource arguments in local mode: {:?}", args);
                }
                Ok(QueryTarget::Manifests(documents))
            }
            Some(_) => Err(StatusError::conflict(
                "resources cannot be given both by argument and by --filename",
            )),
            None => Self::from_args(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_type_list() {
        assert_eq!(
            QueryTarget::from_args(&args(&["pods,svc"])).unwrap(),
            QueryTarget::List {
                types: args(&["pods", "svc"])
            }
        );
    }

    #[test]
    fn test_type_with_names() {
        assert_eq!(
            QueryTarget::from_args(&args(&["deploy", "web", "api"])).unwrap(),
            QueryTarget::Named {
                types: args(&["deploy"]),
                names: args(&["web", "api"])
            }
        );
    }

    #[test]
    fn test_pairs() {
        assert_eq!(
            QueryTarget::from_args(&args(&["po/web-1", "svc/web"])).unwrap(),
            QueryTarget::Pairs(vec![
                ("po".to_string(), "web-1".to_string()),
                ("svc".to_string(), "web".to_string())
            ])
        );
    }

    #[test]
    fn test_mixed_forms_conflict() {
        let err = QueryTarget::from_args(&args(&["pods", "svc/web"])).unwrap_err();
        assert!(matches!(err, StatusError::ConfigurationConflict(_)));
    }

    #[test]
    fn test_nothing_to_show() {
        let err = QueryTarget::build(&[], None, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must provide one or more resources by argument or filename."
        );
    }

    #[test]
    fn test_local_ignores_arguments() {
        let target = QueryTarget::build(&args(&["pods"]), Some(Vec::new()), true).unwrap();
        assert_eq!(target, QueryTarget::Manifests(Vec::new()));
    }

    #[test]
    fn test_live_files_with_arguments_conflict() {
        assert!(QueryTarget::build(&args(&["pods"]), Some(Vec::new()), false).is_err());
    }
}
