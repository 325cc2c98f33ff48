//! Operation envelope and dispatch
//!
//! Every registry operation is a variant of [`Request`], tagged by operation
//! name, and resolves to a [`Response`] variant through [`dispatch`]. The
//! caller's publisher identity travels alongside the request, never inside
//! it: inquiry operations ignore it, publishing operations gate on it.

use serde::{Deserialize, Serialize};

use crate::db::search::{BindingSearch, BusinessSearch, ServiceSearch, TModelSearch};
use crate::models::{
    AssertionStatusItem, BindingTemplate, BusinessEntity, BusinessService, CompletionStatus,
    FindQualifiers, KeyedReference, PublisherAssertion, TModel,
};
use crate::services::KeyList;
use crate::state::RegistryState;
use crate::{Error, Result};

/// The authenticated caller of a publishing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub publisher_id: String,
    pub authorized_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Request {
    FindBusiness {
        #[serde(flatten)]
        criteria: BusinessSearch,
        #[serde(default)]
        find_qualifiers: Vec<String>,
        #[serde(default)]
        max_rows: Option<usize>,
    },
    FindService {
        #[serde(flatten)]
        criteria: ServiceSearch,
        #[serde(default)]
        find_qualifiers: Vec<String>,
        #[serde(default)]
        max_rows: Option<usize>,
    },
    FindBinding {
        #[serde(flatten)]
        criteria: BindingSearch,
        #[serde(default)]
        find_qualifiers: Vec<String>,
        #[serde(default)]
        max_rows: Option<usize>,
    },
    #[serde(rename = "findTModel")]
    FindTModel {
        #[serde(flatten)]
        criteria: TModelSearch,
        #[serde(default)]
        find_qualifiers: Vec<String>,
        #[serde(default)]
        max_rows: Option<usize>,
    },
    FindRelatedBusinesses {
        business_key: String,
        #[serde(default)]
        keyed_reference: Option<KeyedReference>,
        #[serde(default)]
        find_qualifiers: Vec<String>,
        #[serde(default)]
        max_rows: Option<usize>,
    },
    GetBusinessDetail {
        business_keys: Vec<String>,
    },
    GetServiceDetail {
        service_keys: Vec<String>,
    },
    GetBindingDetail {
        binding_keys: Vec<String>,
    },
    #[serde(rename = "getTModelDetail")]
    GetTModelDetail {
        tmodel_keys: Vec<String>,
    },
    SaveBusiness {
        businesses: Vec<BusinessEntity>,
    },
    SaveService {
        services: Vec<BusinessService>,
    },
    SaveBinding {
        bindings: Vec<BindingTemplate>,
    },
    #[serde(rename = "saveTModel")]
    SaveTModel {
        tmodels: Vec<TModel>,
    },
    DeleteBusiness {
        business_keys: Vec<String>,
    },
    DeleteService {
        service_keys: Vec<String>,
    },
    DeleteBinding {
        binding_keys: Vec<String>,
    },
    #[serde(rename = "deleteTModel")]
    DeleteTModel {
        tmodel_keys: Vec<String>,
    },
    AddPublisherAssertions {
        assertions: Vec<PublisherAssertion>,
    },
    DeletePublisherAssertions {
        assertions: Vec<PublisherAssertion>,
    },
    SetPublisherAssertions {
        assertions: Vec<PublisherAssertion>,
    },
    GetPublisherAssertions,
    GetAssertionStatusReport {
        #[serde(default)]
        completion_status: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Response {
    BusinessList(KeyList),
    ServiceList(KeyList),
    BindingList(KeyList),
    #[serde(rename = "tModelList")]
    TModelList(KeyList),
    RelatedBusinessList(KeyList),
    BusinessDetail {
        businesses: Vec<BusinessEntity>,
    },
    ServiceDetail {
        services: Vec<BusinessService>,
    },
    BindingDetail {
        bindings: Vec<BindingTemplate>,
    },
    #[serde(rename = "tModelDetail")]
    TModelDetail {
        tmodels: Vec<TModel>,
    },
    SavedBusinesses {
        businesses: Vec<BusinessEntity>,
    },
    SavedServices {
        services: Vec<BusinessService>,
    },
    SavedBindings {
        bindings: Vec<BindingTemplate>,
    },
    #[serde(rename = "savedTModels")]
    SavedTModels {
        tmodels: Vec<TModel>,
    },
    PublisherAssertions {
        assertions: Vec<PublisherAssertion>,
    },
    AssertionStatusReport {
        items: Vec<AssertionStatusItem>,
    },
    /// Mutation acknowledged with nothing to return.
    Success,
}

/// Resolve one operation against the registry.
pub async fn dispatch(
    state: &RegistryState,
    publisher: &Publisher,
    request: Request,
) -> Result<Response> {
    match request {
        Request::FindBusiness {
            criteria,
            find_qualifiers,
            max_rows,
        } => {
            let qualifiers = FindQualifiers::parse(&find_qualifiers)?;
            let keys = state
                .inquiry
                .find_business(&criteria, &qualifiers, max_rows)
                .await?;
            Ok(Response::BusinessList(keys))
        }
        Request::FindService {
            criteria,
            find_qualifiers,
            max_rows,
        } => {
            let qualifiers = FindQualifiers::parse(&find_qualifiers)?;
            let keys = state
                .inquiry
                .find_service(&criteria, &qualifiers, max_rows)
                .await?;
            Ok(Response::ServiceList(keys))
        }
        Request::FindBinding {
            criteria,
            find_qualifiers,
            max_rows,
        } => {
            let qualifiers = FindQualifiers::parse(&find_qualifiers)?;
            let keys = state
                .inquiry
                .find_binding(&criteria, &qualifiers, max_rows)
                .await?;
            Ok(Response::BindingList(keys))
        }
        Request::FindTModel {
            criteria,
            find_qualifiers,
            max_rows,
        } => {
            let qualifiers = FindQualifiers::parse(&find_qualifiers)?;
            let keys = state
                .inquiry
                .find_tmodel(&criteria, &qualifiers, max_rows)
                .await?;
            Ok(Response::TModelList(keys))
        }
        Request::FindRelatedBusinesses {
            business_key,
            keyed_reference,
            find_qualifiers,
            max_rows,
        } => {
            let qualifiers = FindQualifiers::parse(&find_qualifiers)?;
            let keys = state
                .assertions
                .find_related_businesses(&business_key, keyed_reference.as_ref(), &qualifiers)
                .await?;
            Ok(Response::RelatedBusinessList(
                state.inquiry.clamp(keys, max_rows),
            ))
        }
        Request::GetBusinessDetail { business_keys } => Ok(Response::BusinessDetail {
            businesses: state.inquiry.get_business_detail(&business_keys).await?,
        }),
        Request::GetServiceDetail { service_keys } => Ok(Response::ServiceDetail {
            services: state.inquiry.get_service_detail(&service_keys).await?,
        }),
        Request::GetBindingDetail { binding_keys } => Ok(Response::BindingDetail {
            bindings: state.inquiry.get_binding_detail(&binding_keys).await?,
        }),
        Request::GetTModelDetail { tmodel_keys } => Ok(Response::TModelDetail {
            tmodels: state.inquiry.get_tmodel_detail(&tmodel_keys).await?,
        }),
        Request::SaveBusiness { businesses } => Ok(Response::SavedBusinesses {
            businesses: state
                .publish
                .save_business(&publisher.publisher_id, &publisher.authorized_name, businesses)
                .await?,
        }),
        Request::SaveService { services } => Ok(Response::SavedServices {
            services: state
                .publish
                .save_service(&publisher.publisher_id, services)
                .await?,
        }),
        Request::SaveBinding { bindings } => Ok(Response::SavedBindings {
            bindings: state
                .publish
                .save_binding(&publisher.publisher_id, bindings)
                .await?,
        }),
        Request::SaveTModel { tmodels } => Ok(Response::SavedTModels {
            tmodels: state
                .publish
                .save_tmodel(&publisher.publisher_id, &publisher.authorized_name, tmodels)
                .await?,
        }),
        Request::DeleteBusiness { business_keys } => {
            state
                .publish
                .delete_business(&publisher.publisher_id, business_keys)
                .await?;
            Ok(Response::Success)
        }
        Request::DeleteService { service_keys } => {
            state
                .publish
                .delete_service(&publisher.publisher_id, service_keys)
                .await?;
            Ok(Response::Success)
        }
        Request::DeleteBinding { binding_keys } => {
            state
                .publish
                .delete_binding(&publisher.publisher_id, binding_keys)
                .await?;
            Ok(Response::Success)
        }
        Request::DeleteTModel { tmodel_keys } => {
            state
                .publish
                .delete_tmodel(&publisher.publisher_id, tmodel_keys)
                .await?;
            Ok(Response::Success)
        }
        Request::AddPublisherAssertions { assertions } => {
            state
                .assertions
                .add_assertions(&publisher.publisher_id, assertions)
                .await?;
            Ok(Response::Success)
        }
        Request::DeletePublisherAssertions { assertions } => {
            state
                .assertions
                .delete_assertions(&publisher.publisher_id, assertions)
                .await?;
            Ok(Response::Success)
        }
        Request::SetPublisherAssertions { assertions } => {
            state
                .assertions
                .set_assertions(&publisher.publisher_id, assertions)
                .await?;
            Ok(Response::Success)
        }
        Request::GetPublisherAssertions => Ok(Response::PublisherAssertions {
            assertions: state
                .assertions
                .get_assertions(&publisher.publisher_id)
                .await?,
        }),
        Request::GetAssertionStatusReport { completion_status } => {
            let filter = match completion_status.as_deref() {
                None | Some("") => None,
                Some(raw) => Some(CompletionStatus::parse(raw).ok_or_else(|| {
                    Error::UnsupportedQualifiers(format!("unknown completion status '{raw}'"))
                })?),
            };
            Ok(Response::AssertionStatusReport {
                items: state
                    .assertions
                    .get_assertion_status_items(&publisher.publisher_id, filter)
                    .await?,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_deserialize_from_tagged_json() {
        let request: Request = serde_json::from_str(
            r#"{
                "operation": "findBusiness",
                "names": ["Acme"],
                "find_qualifiers": ["exactNameMatch"]
            }"#,
        )
        .unwrap();
        match request {
            Request::FindBusiness {
                criteria,
                find_qualifiers,
                max_rows,
            } => {
                assert_eq!(criteria.names, vec!["Acme".to_string()]);
                assert_eq!(find_qualifiers, vec!["exactNameMatch".to_string()]);
                assert_eq!(max_rows, None);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let result: std::result::Result<Request, _> =
            serde_json::from_str(r#"{"operation": "findPublisher"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn success_response_serializes_with_result_tag() {
        let json = serde_json::to_value(Response::Success).unwrap();
        assert_eq!(json["result"], "success");
    }
}
