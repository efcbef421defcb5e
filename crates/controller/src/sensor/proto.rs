// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Vendored protobuf bindings for the sensor event API.
//!
//! Generated-style prost/tonic code committed in-tree so builds do not need
//! `protoc`. Covers the subset of the sensor surface the controller
//! consumes: the `GetEvents` server-streaming RPC and its event payloads.

/// Allow-list filter for an event subscription; empty lists match anything.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Filter {
    #[prost(string, repeated, tag = "1")]
    pub namespace: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "2")]
    pub binary_regex: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEventsRequest {
    #[prost(message, repeated, tag = "1")]
    pub allow_list: ::prost::alloc::vec::Vec<Filter>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pod {
    #[prost(string, tag = "1")]
    pub namespace: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Process {
    #[prost(string, tag = "1")]
    pub binary: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub arguments: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub pod: ::core::option::Option<Pod>,
    #[prost(message, optional, tag = "4")]
    pub start_time: ::core::option::Option<::prost_types::Timestamp>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessExec {
    #[prost(message, optional, tag = "1")]
    pub process: ::core::option::Option<Process>,
    #[prost(message, optional, tag = "2")]
    pub parent: ::core::option::Option<Process>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessExit {
    #[prost(message, optional, tag = "1")]
    pub process: ::core::option::Option<Process>,
    #[prost(message, optional, tag = "2")]
    pub parent: ::core::option::Option<Process>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileArg {
    #[prost(string, tag = "1")]
    pub path: ::prost::alloc::string::String,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SockArg {
    #[prost(string, tag = "1")]
    pub saddr: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub daddr: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub sport: u32,
    #[prost(uint32, tag = "4")]
    pub dport: u32,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KprobeArgument {
    #[prost(oneof = "kprobe_argument::Arg", tags = "1, 2, 3, 4")]
    pub arg: ::core::option::Option<kprobe_argument::Arg>,
}
/// Nested message and enum types in `KprobeArgument`.
pub mod kprobe_argument {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Arg {
        #[prost(message, tag = "1")]
        FileArg(super::FileArg),
        #[prost(string, tag = "2")]
        StringArg(::prost::alloc::string::String),
        #[prost(int64, tag = "3")]
        IntArg(i64),
        #[prost(message, tag = "4")]
        SockArg(super::SockArg),
    }
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessKprobe {
    #[prost(message, optional, tag = "1")]
    pub process: ::core::option::Option<Process>,
    #[prost(string, tag = "2")]
    pub function_name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub args: ::prost::alloc::vec::Vec<KprobeArgument>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessTracepoint {
    #[prost(message, optional, tag = "1")]
    pub process: ::core::option::Option<Process>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessDns {
    #[prost(message, optional, tag = "1")]
    pub process: ::core::option::Option<Process>,
}

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEventsResponse {
    #[prost(oneof = "get_events_response::Event", tags = "1, 2, 3, 4, 5")]
    pub event: ::core::option::Option<get_events_response::Event>,
}
/// Nested message and enum types in `GetEventsResponse`.
pub mod get_events_response {
    #[allow(clippy::derive_partial_eq_without_eq)]
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        ProcessExec(super::ProcessExec),
        #[prost(message, tag = "2")]
        ProcessExit(super::ProcessExit),
        #[prost(message, tag = "3")]
        ProcessKprobe(super::ProcessKprobe),
        #[prost(message, tag = "4")]
        ProcessTracepoint(super::ProcessTracepoint),
        #[prost(message, tag = "5")]
        ProcessDns(super::ProcessDns),
    }
}

/// Generated client implementations.
pub mod sensor_events_client {
    #![allow(
        unused_variables,
        dead_code,
        missing_docs,
        clippy::wildcard_imports,
        clippy::let_unit_value
    )]
    use tonic::codegen::http::Uri;
    use tonic::codegen::*;

    /// Client for the sensor's event export service.
    #[derive(Debug, Clone)]
    pub struct SensorEventsClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl SensorEventsClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> SensorEventsClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_origin(inner: T, origin: Uri) -> Self {
            let inner = tonic::client::Grpc::with_origin(inner, origin);
            Self { inner }
        }
        /// Open the filtered event stream.
        pub async fn get_events(
            &mut self,
            request: impl tonic::IntoRequest<super::GetEventsRequest>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::GetEventsResponse>>,
            tonic::Status,
        > {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                http::uri::PathAndQuery::from_static("/sensor.SensorEvents/GetEvents");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("sensor.SensorEvents", "GetEvents"));
            self.inner.server_streaming(req, path, codec).await
        }
    }
}
