//! certificate schema definition
//!
//! Auto-generated from CustomResourceDefinition: certificates.cert-manager.io (v1)
//!
//! DO NOT EDIT MANUALLY - regenerate with crdform-codegen

use super::{ManifestSchemaConfig, enum_type};
use crate::schemas::base_schema;
use crdform_core::schema::{AttributeSchema, AttributeType};

/// Returns the schema config for cert_manager_io_certificate_v1 (cert-manager.io/v1 Certificate)
pub fn cert_manager_io_certificate_v1_config() -> ManifestSchemaConfig {
    ManifestSchemaConfig {
        api_version: "cert-manager.io/v1",
        kind: "Certificate",
        resource_type_name: "cert_manager_io_certificate_v1",
        namespaced: true,
        schema: base_schema("k8s.cert_manager_io_certificate_v1")
            .with_description("A Certificate resource should be created to ensure an up to date and signed X.509 certificate is stored in the Kubernetes Secret resource named in `sp...")
            .attribute(
                AttributeSchema::new("spec", spec_type())
                    .required()
                    .with_description("Specification of the desired state of the Certificate resource."),
            ),
    }
}

fn issuer_ref_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("group", AttributeType::String)
            .with_description("Group of the resource being referred to."),
        AttributeSchema::new("kind", AttributeType::String)
            .with_description("Kind of the resource being referred to."),
        AttributeSchema::new("name", AttributeType::String)
            .required()
            .with_description("Name of the resource being referred to."),
    ])
}

fn private_key_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("algorithm", enum_type(&["RSA", "ECDSA", "Ed25519"]))
            .with_description("Algorithm is the private key algorithm of the corresponding private key for this certificate."),
        AttributeSchema::new("encoding", enum_type(&["PKCS1", "PKCS8"]))
            .with_description("The private key cryptography standards (PKCS) encoding for this certificate's private key to be encoded in."),
        AttributeSchema::new("rotation_policy", enum_type(&["Never", "Always"]))
            .with_description("RotationPolicy controls how private keys should be regenerated when a re-issuance is being processed.")
            .with_yaml_name("rotationPolicy"),
        AttributeSchema::new("size", AttributeType::Int)
            .with_description("Size is the key bit size of the corresponding private key for this certificate."),
    ])
}

fn secret_template_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("annotations", AttributeType::Map(Box::new(AttributeType::String)))
            .with_description("Annotations is a key value map to be copied to the target Kubernetes Secret."),
        AttributeSchema::new("labels", AttributeType::Map(Box::new(AttributeType::String)))
            .with_description("Labels is a key value map to be copied to the target Kubernetes Secret."),
    ])
}

fn subject_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("countries", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Countries to be used on the Certificate."),
        AttributeSchema::new("localities", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Cities to be used on the Certificate."),
        AttributeSchema::new("organizational_units", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Organizational Units to be used on the Certificate.")
            .with_yaml_name("organizationalUnits"),
        AttributeSchema::new("organizations", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Organizations to be used on the Certificate."),
    ])
}

fn spec_type() -> AttributeType {
    AttributeType::Object(vec![
        AttributeSchema::new("common_name", AttributeType::String.with_length(None, Some(64)))
            .with_description("Requested common name X509 certificate subject attribute.")
            .with_yaml_name("commonName"),
        AttributeSchema::new("dns_names", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Requested DNS subject alternative names.")
            .with_yaml_name("dnsNames"),
        AttributeSchema::new("duration", AttributeType::String)
            .with_description("Requested 'duration' (i.e. lifetime) of the Certificate."),
        AttributeSchema::new("email_addresses", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Requested email subject alternative names.")
            .with_yaml_name("emailAddresses"),
        AttributeSchema::new("ip_addresses", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Requested IP address subject alternative names.")
            .with_yaml_name("ipAddresses"),
        AttributeSchema::new("is_ca", AttributeType::Bool)
            .with_description("Requested basic constraints isCA value.")
            .with_yaml_name("isCA"),
        AttributeSchema::new("issuer_ref", issuer_ref_type())
            .required()
            .with_description("Reference to the issuer responsible for issuing the certificate.")
            .with_yaml_name("issuerRef"),
        AttributeSchema::new("private_key", private_key_type())
            .with_description("Private key options.")
            .with_yaml_name("privateKey"),
        AttributeSchema::new("renew_before", AttributeType::String)
            .with_description("How long before the currently issued certificate's expiry cert-manager should renew the certificate.")
            .with_yaml_name("renewBefore"),
        AttributeSchema::new("revision_history_limit", AttributeType::Int.with_range(Some(1), None))
            .with_description("The maximum number of CertificateRequest revisions that are maintained in the Certificate's history.")
            .with_yaml_name("revisionHistoryLimit"),
        AttributeSchema::new("secret_name", AttributeType::String)
            .required()
            .with_description("Name of the Secret resource that will be automatically created and managed by this Certificate resource.")
            .with_yaml_name("secretName"),
        AttributeSchema::new("secret_template", secret_template_type())
            .with_description("Defines annotations and labels to be copied to the Certificate's Secret.")
            .with_yaml_name("secretTemplate"),
        AttributeSchema::new("subject", subject_type())
            .with_description("Requested set of X509 certificate subject attributes."),
        AttributeSchema::new("uris", AttributeType::List(Box::new(AttributeType::String)))
            .with_description("Requested URI subject alternative names."),
        AttributeSchema::new("usages", AttributeType::List(Box::new(enum_type(&["signing", "digital signature", "content commitment", "key encipherment", "key agreement", "data encipherment", "cert sign", "crl sign", "encipher only", "decipher only", "any", "server auth", "client auth", "code signing", "email protection", "s/mime", "ipsec end system", "ipsec tunnel", "ipsec user", "timestamping", "ocsp signing", "microsoft sgc", "netscape sgc"]))))
            .with_description("Requested key usages and extended key usages."),
    ])
}
